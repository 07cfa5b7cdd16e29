use std::collections::HashMap;

use log::{debug, trace};

use crate::ast::*;
use crate::error::Error;
use crate::lexer::Position;


pub type ScopeId = usize;

#[derive(Debug, PartialEq, Clone)]
pub struct VarSymbol {
    pub name: String,
    pub type_spec: TypeSpec,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Symbol {
    BuiltinType(TypeSpec),
    Variable(VarSymbol),
    Procedure { name: String, params: Vec<VarSymbol> },
    Program(String),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::BuiltinType(t) => t.name(),
            Symbol::Variable(v) => &v.name,
            Symbol::Procedure { name, .. } => name,
            Symbol::Program(name) => name,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Scope {
    pub name: String,
    pub level: usize,
    pub parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn new(name: &str, level: usize, parent: Option<ScopeId>) -> Scope {
        Scope { name: name.to_string(), level, parent, symbols: HashMap::new() }
    }

    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// Every scope created while analysing a program. Scope 0 holds the builtin
/// types; the others point at their enclosing scope by index.
#[derive(Debug, PartialEq)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub const BUILTIN: ScopeId = 0;

    fn new() -> SymbolTable {
        let mut builtin = Scope::new("builtin", 0, None);
        for t in &[TypeSpec::Integer, TypeSpec::Real] {
            builtin.symbols.insert(t.name().to_string(), Symbol::BuiltinType(*t));
        }
        SymbolTable { scopes: vec![builtin] }
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn find_scope(&self, name: &str) -> Option<ScopeId> {
        self.scopes.iter().position(|s| s.name == name)
    }

    /// Nearest enclosing declaration of `name`, starting at `from`.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<&Symbol> {
        let mut id = Some(from);
        while let Some(i) = id {
            let scope = &self.scopes[i];
            trace!("lookup: {} in {}", name, scope.name);
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            id = scope.parent;
        }
        None
    }

    fn push_scope(&mut self, name: &str, parent: ScopeId) -> ScopeId {
        let level = self.scopes[parent].level + 1;
        self.scopes.push(Scope::new(name, level, Some(parent)));
        self.scopes.len() - 1
    }

    fn define(&mut self, scope: ScopeId, symbol: Symbol, position: Position) -> Result<(), Error> {
        let scope = &mut self.scopes[scope];
        if scope.symbols.contains_key(symbol.name()) {
            return Err(Error::semantic(
                format!("duplicate declaration of '{}'", symbol.name()),
                position));
        }
        debug!("define: {:?} in {}", symbol, scope.name);
        scope.symbols.insert(symbol.name().to_string(), symbol);
        Ok(())
    }
}

struct SemanticAnalyzer {
    table: SymbolTable,
    current: ScopeId,
}

impl SemanticAnalyzer {
    fn new() -> SemanticAnalyzer {
        SemanticAnalyzer { table: SymbolTable::new(), current: SymbolTable::BUILTIN }
    }

    fn enter_scope(&mut self, name: &str) {
        self.current = self.table.push_scope(name, self.current);
        debug!("ENTER scope: {}", name);
    }

    fn leave_scope(&mut self) {
        let scope = self.table.scope(self.current);
        debug!("LEAVE scope: {}", scope.name);
        self.current = scope.parent.unwrap_or(SymbolTable::BUILTIN);
    }

    fn define(&mut self, symbol: Symbol, position: Position) -> Result<(), Error> {
        self.table.define(self.current, symbol, position)
    }

    fn resolve_type(&self, type_spec: TypeSpec, position: Position) -> Result<TypeSpec, Error> {
        match self.table.lookup(self.current, type_spec.name()) {
            Some(Symbol::BuiltinType(t)) => Ok(*t),
            _ => Err(Error::semantic(format!("unknown type {}", type_spec.name()), position)),
        }
    }

    fn program(&mut self, p: &Program) -> Result<(), Error> {
        let builtin = &mut self.table.scopes[SymbolTable::BUILTIN];
        builtin.symbols.insert(p.name.clone(), Symbol::Program(p.name.clone()));

        self.enter_scope(&p.name);
        self.block(&p.block)?;
        self.leave_scope();
        Ok(())
    }

    fn block(&mut self, b: &Block) -> Result<(), Error> {
        for d in &b.declarations {
            match d {
                Declaration::Var(v) => self.var_decl(v)?,
                Declaration::Procedure(p) => self.procedure_decl(p)?,
            }
        }
        for s in &b.body {
            self.statement(s)?;
        }
        Ok(())
    }

    fn var_decl(&mut self, decl: &VarDecl) -> Result<(), Error> {
        let type_spec = self.resolve_type(decl.type_spec, decl.var.position)?;
        let symbol = Symbol::Variable(VarSymbol { name: decl.var.name.clone(), type_spec });
        self.define(symbol, decl.var.position)
    }

    fn procedure_decl(&mut self, decl: &ProcedureDecl) -> Result<(), Error> {
        let symbol = Symbol::Procedure { name: decl.name.clone(), params: Vec::new() };
        self.define(symbol, decl.position)?;
        let enclosing = self.current;

        self.enter_scope(&decl.name);

        let mut params = Vec::new();
        for p in &decl.params {
            let type_spec = self.resolve_type(p.type_spec, p.var.position)?;
            let param = VarSymbol { name: p.var.name.clone(), type_spec };
            self.define(Symbol::Variable(param.clone()), p.var.position)?;
            params.push(param);
        }

        if let Some(Symbol::Procedure { params: declared, .. }) =
            self.table.scopes[enclosing].symbols.get_mut(&decl.name)
        {
            *declared = params;
        }

        self.block(&decl.block)?;
        self.leave_scope();
        Ok(())
    }

    fn statement(&mut self, s: &Statement) -> Result<(), Error> {
        match s {
            Statement::Compound(stmts) => {
                for s in stmts {
                    self.statement(s)?;
                }
            }
            Statement::Assign(var, e) => {
                self.var(var)?;
                self.expr(e)?;
            }
            Statement::If(cond, cons, alt) => {
                self.expr(cond)?;
                self.statement(cons)?;
                if let Some(alt) = alt {
                    self.statement(alt)?;
                }
            }
            Statement::While(cond, body) => {
                self.expr(cond)?;
                self.statement(body)?;
            }
            Statement::ProcedureCall(call) => self.procedure_call(call)?,
            Statement::NoOp => {}
        }
        Ok(())
    }

    fn procedure_call(&mut self, call: &ProcedureCall) -> Result<(), Error> {
        match self.table.lookup(self.current, &call.name) {
            Some(Symbol::Procedure { params, .. }) => {
                if params.len() != call.args.len() {
                    return Err(Error::semantic(
                        format!(
                            "procedure {} requires {} arguments, {} given",
                            call.name, params.len(), call.args.len()),
                        call.position));
                }
            }
            Some(_) => {
                return Err(Error::semantic(
                    format!("'{}' is not a procedure", call.name),
                    call.position));
            }
            None => {
                return Err(Error::semantic(
                    format!("undefined procedure '{}'", call.name),
                    call.position));
            }
        }

        for arg in &call.args {
            self.expr(arg)?;
        }
        Ok(())
    }

    fn var(&mut self, var: &Var) -> Result<(), Error> {
        match self.table.lookup(self.current, &var.name) {
            Some(_) => Ok(()),
            None => Err(Error::semantic(
                format!("undefined name '{}'", var.name),
                var.position)),
        }
    }

    fn expr(&mut self, e: &Expr) -> Result<(), Error> {
        match e {
            Expr::Num(_) => Ok(()),
            Expr::BinOp(_, l, r, _) => {
                self.expr(l)?;
                self.expr(r)
            }
            Expr::UnaryOp(_, operand, _) => self.expr(operand),
            Expr::Var(v) => self.var(v),
        }
    }
}

/// Checks that every name is declared before use, that no scope declares a
/// name twice and that procedure calls pass the declared number of arguments.
pub fn analyze(p: &Program) -> Result<SymbolTable, Error> {
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.program(p)?;
    Ok(analyzer.table)
}


#[cfg(test)]
mod test {
    use crate::ast::TypeSpec;
    use crate::error::Error;
    use crate::lexer::Position;
    use crate::parser::parse;
    use super::{Symbol, SymbolTable, VarSymbol, analyze};

    fn analyze_str(s: &str) -> Result<SymbolTable, Error> {
        analyze(&parse(s).unwrap())
    }

    fn semantic(message: &str, line: u64, col: u64) -> Error {
        Error::Semantic { message: message.to_string(), position: Position(line, col) }
    }

    fn variable(name: &str, type_spec: TypeSpec) -> Symbol {
        Symbol::Variable(VarSymbol { name: name.to_string(), type_spec })
    }

    #[test]
    fn simple() {
        let table = analyze_str("PROGRAM P4; VAR x : INTEGER; BEGIN x := 2; END.").unwrap();

        let builtin = table.scope(SymbolTable::BUILTIN);
        assert_eq!(builtin.lookup_local("P4"), Some(&Symbol::Program("P4".to_string())));
        assert_eq!(builtin.lookup_local("INTEGER"), Some(&Symbol::BuiltinType(TypeSpec::Integer)));

        let global = table.scope(table.find_scope("P4").unwrap());
        assert_eq!(global.level, 1);
        assert_eq!(global.parent, Some(SymbolTable::BUILTIN));
        assert_eq!(global.lookup_local("x"), Some(&variable("x", TypeSpec::Integer)));
    }

    #[test]
    fn undeclared() {
        assert_eq!(
            analyze_str("program Main;\n  var x : integer;\nbegin\n  x := y;\nend.").map(|_| ()),
            Err(semantic("undefined name 'y'", 4, 8)));

        assert_eq!(
            analyze_str("PROGRAM p; BEGIN a := 2 END.").map(|_| ()),
            Err(semantic("undefined name 'a'", 1, 18)));

        assert_eq!(
            analyze_str("PROGRAM p; VAR a : INTEGER; BEGIN IF (z) a := 1 END.").map(|_| ()),
            Err(semantic("undefined name 'z'", 1, 39)));
    }

    #[test]
    fn enclosing_scopes() {
        let table = analyze_str("\
program Main;
   var x, y : real;

   procedure AlphaA(a : integer);
      var y : integer;
      procedure AlphaB(a : integer);
        var z : integer;
      begin
        x := 15.6;
      end;
   begin
   end;

begin
end.").unwrap();

        let alpha_a = table.scope(table.find_scope("AlphaA").unwrap());
        assert_eq!(alpha_a.level, 2);
        assert_eq!(alpha_a.lookup_local("y"), Some(&variable("y", TypeSpec::Integer)));

        let alpha_b = table.find_scope("AlphaB").unwrap();
        assert_eq!(table.scope(alpha_b).level, 3);
        assert_eq!(table.lookup(alpha_b, "x"), Some(&variable("x", TypeSpec::Real)));
        assert_eq!(table.lookup(alpha_b, "y"), Some(&variable("y", TypeSpec::Integer)));
        assert_eq!(table.lookup(alpha_b, "nope"), None);
    }

    #[test]
    fn procedure_scope_is_private() {
        assert_eq!(
            analyze_str("\
program Main;
   var x, y : real;
   procedure AlphaA(a : integer);
      var y : integer;
   begin
   end;
   procedure AlphaB(a : integer);
      var b : integer;
   begin
   end;
begin
    a := 10;
end.").map(|_| ()),
            Err(semantic("undefined name 'a'", 12, 5)));
    }

    #[test]
    fn duplicates() {
        assert_eq!(
            analyze_str("\
program Main;
   var x, y : real;
   procedure AlphaA(a : integer);
      var a : integer;
   begin
   end;
begin
end.").map(|_| ()),
            Err(semantic("duplicate declaration of 'a'", 4, 11)));

        assert_eq!(
            analyze_str("PROGRAM p; VAR a : INTEGER; a : REAL; BEGIN END.").map(|_| ()),
            Err(semantic("duplicate declaration of 'a'", 1, 29)));

        assert_eq!(
            analyze_str("PROGRAM p; PROCEDURE f; BEGIN END; PROCEDURE f; BEGIN END; BEGIN END.")
                .map(|_| ()),
            Err(semantic("duplicate declaration of 'f'", 1, 46)));

        assert_eq!(
            analyze_str("PROGRAM p; PROCEDURE f(a, a : INTEGER); BEGIN END; BEGIN END.").map(|_| ()),
            Err(semantic("duplicate declaration of 'a'", 1, 27)));
    }

    #[test]
    fn shadowing() {
        let table = analyze_str("\
program Main;
   var x, y : real;
   procedure AlphaA(a : integer);
      var y : integer;
   begin
      y := a + 1;
      x := 12.5
   end;
begin
end.").unwrap();

        let main = table.find_scope("Main").unwrap();
        assert_eq!(table.lookup(main, "y"), Some(&variable("y", TypeSpec::Real)));
        let alpha = table.find_scope("AlphaA").unwrap();
        assert_eq!(table.lookup(alpha, "y"), Some(&variable("y", TypeSpec::Integer)));
    }

    #[test]
    fn procedure_symbols() {
        let table = analyze_str("\
program Main;
procedure Alpha(a : integer; b : real);
var x : integer;
begin
   x := (a + b) * 2;
   Alpha(1, 2)
end;
begin
   Alpha(3 + 5, 7.5);
end.").unwrap();

        let main = table.find_scope("Main").unwrap();
        assert_eq!(
            table.scope(main).lookup_local("Alpha"),
            Some(&Symbol::Procedure {
                name: "Alpha".to_string(),
                params: vec![
                    VarSymbol { name: "a".to_string(), type_spec: TypeSpec::Integer },
                    VarSymbol { name: "b".to_string(), type_spec: TypeSpec::Real },
                ],
            }));
    }

    #[test]
    fn bad_calls() {
        let decl = "program Main;\nprocedure Alpha(a : integer; b : integer);\nbegin\nend;\n";

        assert_eq!(
            analyze_str(&format!("{}begin\n Alpha(3, 5, 7);\nend.", decl)).map(|_| ()),
            Err(semantic("procedure Alpha requires 2 arguments, 3 given", 6, 2)));

        assert_eq!(
            analyze_str(&format!("{}begin\n Beta(1);\nend.", decl)).map(|_| ()),
            Err(semantic("undefined procedure 'Beta'", 6, 2)));


        assert_eq!(
            analyze_str("PROGRAM p; VAR x : INTEGER; BEGIN x(1) END.").map(|_| ()),
            Err(semantic("'x' is not a procedure", 1, 35)));

        assert_eq!(
            analyze_str(&format!("{}begin\n Alpha(1, z);\nend.", decl)).map(|_| ()),
            Err(semantic("undefined name 'z'", 6, 11)));
    }

    #[test]
    fn any_declared_name_resolves() {
        assert!(analyze_str("PROGRAM p; VAR a : INTEGER; BEGIN a := p END.").is_ok());
        assert!(analyze_str("\
program Main;
procedure Alpha(a : integer; b : integer);
begin
end;
begin
   Alpha(1, Alpha);
end.").is_ok());
    }

    #[test]
    fn argument_types_are_not_checked() {
        assert!(analyze_str("\
program Main;
procedure Alpha(a : integer; b : integer);
begin
end;
begin
   Alpha(3.5, 7.25);
end.").is_ok());
    }

    #[test]
    fn no_forward_references() {
        assert_eq!(
            analyze_str("\
PROGRAM p;
PROCEDURE f;
BEGIN
   x := 1
END;
VAR x : INTEGER;
BEGIN
END.").map(|_| ()),
            Err(semantic("undefined name 'x'", 4, 4)));
    }
}
