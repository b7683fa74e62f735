//! Abstract Syntax Tree for Coi.
//!
//! Three disjoint universes, each a single tagged enum: [`Expression`],
//! [`Statement`] and [`ViewNode`]. Declarations ([`Component`], [`DataDef`],
//! [`EnumDef`]) and the whole [`Program`] are plain structs that own their
//! children. Cross references (a component used as a tag, an enum value) are
//! by name only.

use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal: `42`, `0xFF`
    Int(i32),

    /// Float literal: `3.14`
    Float(f64),

    /// String literal. `template` is true for backtick strings.
    Str { value: String, template: bool },

    /// Boolean literal: `true`, `false`
    Bool(bool),

    /// Identifier: `count`
    Ident(String),

    /// Member access: `user.name`
    Member {
        object: Box<Expression>,
        member: String,
    },

    /// Index access: `items[0]`
    Index {
        array: Box<Expression>,
        index: Box<Expression>,
    },

    /// Function or method call. `name` is the dotted callee text
    /// (`Input.isKeyDown`, `items.push`).
    Call {
        name: String,
        args: Vec<CallArg>,
        line: usize,
    },

    /// Component construction: `Counter(start = 1)`
    Construct {
        component: String,
        args: Vec<CallArg>,
    },

    /// Aggregate literal for data types and components: `Point{1, 2}`
    Aggregate {
        type_name: String,
        args: Vec<CallArg>,
    },

    /// Enum value: `Mode::Idle`, or `App.Mode::Idle` for a shared enum.
    EnumAccess {
        component: Option<String>,
        enum_name: String,
        value: String,
    },

    /// Unary operation: `-x`, `!done`
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    /// Binary operation: `a + b`
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },

    /// Ternary: `cond ? a : b`
    Ternary {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
    },

    /// Postfix operation: `i++`
    Postfix {
        operand: Box<Expression>,
        op: PostfixOp,
    },

    /// Array literal: `[1, 2, 3]`
    Array(Vec<Expression>),

    /// Array repeat literal: `[0; 16]`
    ArrayRepeat {
        value: Box<Expression>,
        count: Box<Expression>,
    },

    /// Type used as a value, e.g. `User[]` in `Json.parse(User[], s)`.
    TypeLiteral(String),

    /// Borrow: `&expr`
    Reference(Box<Expression>),

    /// Ownership transfer: `:expr`
    Move(Box<Expression>),

    /// `match subject { pattern => body, ... }`
    Match {
        subject: Box<Expression>,
        arms: Vec<MatchArm>,
    },

    /// A braced statement list used as a match arm body.
    Block(Vec<Statement>),
}

impl Expression {
    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Ident(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Str {
            value: value.into(),
            template: false,
        }
    }

    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn member(object: Expression, member: impl Into<String>) -> Self {
        Expression::Member {
            object: Box::new(object),
            member: member.into(),
        }
    }

    pub fn index(array: Expression, index: Expression) -> Self {
        Expression::Index {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expression::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// An argument in a call, construction or aggregate literal.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    /// Set for named arguments (`name = v`, `name := v`).
    pub name: Option<String>,
    pub value: Expression,
    pub is_reference: bool,
    pub is_move: bool,
}

impl CallArg {
    pub fn positional(value: Expression) -> Self {
        Self {
            name: None,
            value,
            is_reference: false,
            is_move: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Operator named by a compound assignment operator (`+=` → `Add`).
    pub fn from_compound(op: &str) -> Option<Self> {
        match op {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            "%" => Some(BinaryOp::Mod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

impl PostfixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PostfixOp::Increment => "++",
            PostfixOp::Decrement => "--",
        }
    }
}

/// One arm of a `match` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: MatchPattern,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchPattern {
    /// `else`
    Else,
    /// `Mode::Idle` or `App.Mode::Idle`
    Enum {
        component: Option<String>,
        enum_name: String,
        value: String,
    },
    /// `0`, `"ok"`, `true`
    Literal(Expression),
    /// `Success(user)`: a variant name that binds its payload.
    Binding { variant: String, binding: String },
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// Array shape of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayKind {
    #[default]
    None,
    /// `T[]`
    Dynamic,
    /// `T[N]`
    Fixed(usize),
}

/// A declared type: base name plus optional array shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub array: ArrayKind,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array: ArrayKind::None,
        }
    }

    pub fn array_of(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array: ArrayKind::Dynamic,
        }
    }

    /// Uppercase, non-array types name components (or data types).
    pub fn is_uppercase(&self) -> bool {
        starts_uppercase(&self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array {
            ArrayKind::None => write!(f, "{}", self.name),
            ArrayKind::Dynamic => write!(f, "{}[]", self.name),
            ArrayKind::Fixed(n) => write!(f, "{}[{n}]", self.name),
        }
    }
}

/// A variable declaration, used both for locals and component state.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: TypeRef,
    pub name: String,
    pub initializer: Option<Expression>,
    pub is_mutable: bool,
    pub is_reference: bool,
    /// Initialized with `:=`.
    pub is_move: bool,
    pub is_public: bool,
    pub is_shared: bool,
}

impl VarDecl {
    pub fn new(ty: TypeRef, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
            initializer: None,
            is_mutable: false,
            is_reference: false,
            is_move: false,
            is_public: false,
            is_shared: false,
        }
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Block(Vec<Statement>),

    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },

    /// `for i in start:end body`
    ForRange {
        var: String,
        start: Expression,
        end: Expression,
        body: Box<Statement>,
    },

    /// `for item in items body`
    ForEach {
        var: String,
        iterable: Expression,
        body: Box<Statement>,
    },

    Return(Option<Expression>),

    VarDecl(VarDecl),

    /// `name = value;` Compound forms on plain names are desugared to
    /// `name = name op value`.
    Assign {
        name: String,
        value: Expression,
        is_move: bool,
    },

    /// `a.b.c = value;` with `object = a.b`, `member = c`.
    MemberAssign {
        object: Expression,
        member: String,
        value: Expression,
        compound_op: Option<BinaryOp>,
        is_move: bool,
    },

    /// `array[index] = value;`
    IndexAssign {
        array: Expression,
        index: Expression,
        value: Expression,
        compound_op: Option<BinaryOp>,
        is_move: bool,
    },

    Expr(Expression),
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// A node in a component's view tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode {
    Element(Element),

    /// `<if cond> ... <else> ... </else> </if>`
    If {
        condition: Expression,
        then_children: Vec<ViewNode>,
        else_children: Vec<ViewNode>,
    },

    /// `<for i in start:end> ... </for>`
    ForRange {
        var: String,
        start: Expression,
        end: Expression,
        children: Vec<ViewNode>,
    },

    /// `<for item in items key={item.id}> ... </for>`
    ForEach {
        var: String,
        iterable: Expression,
        key: Expression,
        children: Vec<ViewNode>,
    },

    Text(String),

    /// `{expr}` inside an element.
    Interpolation(Expression),

    /// `<Counter value={x} />`, `<{member} />` or `<member />`.
    Component(ComponentInstance),

    /// `<route />`
    RoutePlaceholder,
}

/// An HTML element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<ViewNode>,
    /// Variable bound with `&={var}`.
    pub ref_binding: Option<String>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&Expression> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }
}

/// An attribute on an element. Value-less attributes carry `Bool(true)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Expression,
}

/// A child component placed in a view.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance {
    pub component: String,
    pub props: Vec<Prop>,
    /// Set when the instance projects an existing member (`<{var}/>`).
    pub member: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub name: String,
    pub value: Expression,
    pub is_reference: bool,
    pub is_move: bool,
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeRef,
    pub name: String,
    pub is_mutable: bool,
    pub is_reference: bool,
}

/// A method, or a lifecycle hook (`init`, `mount`, `tick`) stored under
/// its keyword name.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: String,
    pub body: Vec<Statement>,
    pub is_public: bool,
}

impl FunctionDef {
    pub fn hook(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            return_type: "void".to_string(),
            body: Vec::new(),
            is_public: false,
        }
    }

    pub fn is_lifecycle_hook(&self) -> bool {
        matches!(self.name.as_str(), "init" | "mount" | "tick")
    }
}

/// Signature of a callback parameter: `def onClick(int) : void`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackSig {
    pub params: Vec<String>,
    pub return_type: String,
}

/// A constructor parameter of a component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentParam {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Expression>,
    pub is_public: bool,
    pub is_mutable: bool,
    pub is_reference: bool,
    pub callback: Option<CallbackSig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataField {
    pub ty: String,
    pub name: String,
}

/// `data Point { int x; int y; }`
#[derive(Debug, Clone, PartialEq)]
pub struct DataDef {
    pub name: String,
    pub fields: Vec<DataField>,
    pub is_public: bool,
    pub module: String,
}

/// `enum Mode { Idle, Running }`
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
    pub is_public: bool,
    pub is_shared: bool,
    /// Component that declared a `shared enum`.
    pub owner: Option<String>,
    pub module: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: String,
    pub component: String,
    pub args: Vec<CallArg>,
    pub line: usize,
}

/// `router { "/" => Home, "/about" => About(title = "x") }`
#[derive(Debug, Clone, PartialEq)]
pub struct RouterDef {
    pub routes: Vec<Route>,
    pub line: usize,
}

/// A component definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Component {
    pub name: String,
    pub module: String,
    pub is_public: bool,
    pub line: usize,
    pub params: Vec<ComponentParam>,
    pub state: Vec<VarDecl>,
    pub data: Vec<DataDef>,
    pub enums: Vec<EnumDef>,
    pub methods: Vec<FunctionDef>,
    pub view: Vec<ViewNode>,
    pub css: String,
    pub global_css: String,
    pub router: Option<RouterDef>,
    /// Members whose type is a component: member name → component.
    pub component_members: BTreeMap<String, String>,
    /// Members whose type is an array of components: member name → element component.
    pub component_arrays: BTreeMap<String, String>,
}

impl Component {
    /// `module_Name`, or just `Name` outside a module. Used for scoping
    /// attributes and emitted type names.
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.module, &self.name)
    }

    pub fn method(&self, name: &str) -> Option<&FunctionDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has_tick(&self) -> bool {
        self.method("tick").is_some()
    }
}

/// Join a module and a local name into the emitted identifier.
pub fn qualified_name(module: &str, name: &str) -> String {
    if module.is_empty() {
        name.to_string()
    } else {
        format!("{module}_{name}")
    }
}

/// `app { ... }` configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub root: Option<String>,
    pub title: String,
    pub description: String,
    pub lang: String,
    pub routes: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: None,
            title: String::new(),
            description: String::new(),
            lang: "en".to_string(),
            routes: BTreeMap::new(),
        }
    }
}

/// A parsed program: one or more source files merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub components: Vec<Component>,
    pub data: Vec<DataDef>,
    pub enums: Vec<EnumDef>,
    pub imports: Vec<String>,
    pub app: AppConfig,
}

impl Program {
    /// Assign a module to every declaration in the program.
    pub fn set_module(&mut self, module: &str) {
        for comp in &mut self.components {
            comp.module = module.to_string();
            for data in &mut comp.data {
                data.module = module.to_string();
            }
            for def in &mut comp.enums {
                def.module = module.to_string();
            }
        }
        for data in &mut self.data {
            data.module = module.to_string();
        }
        for def in &mut self.enums {
            def.module = module.to_string();
        }
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// The declared root, or `Main` when none is declared.
    pub fn root_component(&self) -> Option<&Component> {
        match &self.app.root {
            Some(root) => self.component(root),
            None => self.component("Main"),
        }
    }
}

pub fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

// ---------------------------------------------------------------------------
// Display (source-like rendering, fully parenthesized)
// ---------------------------------------------------------------------------

fn write_args(f: &mut fmt::Formatter<'_>, args: &[CallArg]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reference {
            write!(f, "&")?;
        }
        match &self.name {
            Some(name) if self.is_move => write!(f, "{name} := {}", self.value),
            Some(name) => write!(f, "{name} = {}", self.value),
            None if self.is_move => write!(f, ":{}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPattern::Else => write!(f, "else"),
            MatchPattern::Enum {
                component: Some(c),
                enum_name,
                value,
            } => write!(f, "{c}.{enum_name}::{value}"),
            MatchPattern::Enum {
                component: None,
                enum_name,
                value,
            } => write!(f, "{enum_name}::{value}"),
            MatchPattern::Literal(expr) => write!(f, "{expr}"),
            MatchPattern::Binding { variant, binding } => write!(f, "{variant}({binding})"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Int(v) => write!(f, "{v}"),
            Expression::Float(v) => write!(f, "{v:?}"),
            Expression::Str {
                value,
                template: false,
            } => write!(f, "\"{value}\""),
            Expression::Str {
                value,
                template: true,
            } => write!(f, "`{value}`"),
            Expression::Bool(v) => write!(f, "{v}"),
            Expression::Ident(name) => write!(f, "{name}"),
            Expression::Member { object, member } => write!(f, "{object}.{member}"),
            Expression::Index { array, index } => write!(f, "{array}[{index}]"),
            Expression::Call { name, args, .. } => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expression::Construct { component, args } => {
                write!(f, "{component}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expression::Aggregate { type_name, args } => {
                write!(f, "{type_name}{{")?;
                write_args(f, args)?;
                write!(f, "}}")
            }
            Expression::EnumAccess {
                component,
                enum_name,
                value,
            } => match component {
                Some(c) => write!(f, "{c}.{enum_name}::{value}"),
                None => write!(f, "{enum_name}::{value}"),
            },
            Expression::Unary { op, operand } => write!(f, "({}{operand})", op.as_str()),
            Expression::Binary { left, op, right } => {
                write!(f, "({left} {} {right})", op.as_str())
            }
            Expression::Ternary {
                condition,
                then_expr,
                else_expr,
            } => write!(f, "({condition} ? {then_expr} : {else_expr})"),
            Expression::Postfix { operand, op } => write!(f, "({operand}{})", op.as_str()),
            Expression::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Expression::ArrayRepeat { value, count } => write!(f, "[{value}; {count}]"),
            Expression::TypeLiteral(name) => write!(f, "{name}"),
            Expression::Reference(inner) => write!(f, "&{inner}"),
            Expression::Move(inner) => write!(f, ":{inner}"),
            Expression::Match { subject, arms } => {
                write!(f, "match {subject} {{ ")?;
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", arm.pattern, arm.body)?;
                }
                write!(f, " }}")
            }
            Expression::Block(stmts) => write!(f, "{{ {} statements }}", stmts.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("", "App"), "App");
        assert_eq!(qualified_name("ui", "Button"), "ui_Button");
    }

    #[test]
    fn test_type_ref_display() {
        assert_eq!(TypeRef::new("int").to_string(), "int");
        assert_eq!(TypeRef::array_of("Row").to_string(), "Row[]");
        let fixed = TypeRef {
            name: "float".into(),
            array: ArrayKind::Fixed(4),
        };
        assert_eq!(fixed.to_string(), "float[4]");
    }

    #[test]
    fn test_expression_display_parenthesizes() {
        let expr = Expression::binary(
            Expression::Int(1),
            BinaryOp::Add,
            Expression::binary(Expression::Int(2), BinaryOp::Mul, Expression::Int(3)),
        );
        assert_eq!(expr.to_string(), "(1 + (2 * 3))");
    }

    #[test]
    fn test_member_chain_display() {
        let expr = Expression::member(
            Expression::index(Expression::ident("rows"), Expression::Int(0)),
            "label",
        );
        assert_eq!(expr.to_string(), "rows[0].label");
    }

    #[test]
    fn test_set_module_updates_all_declarations() {
        let mut program = Program {
            components: vec![Component {
                name: "App".into(),
                ..Component::default()
            }],
            ..Program::default()
        };
        program.set_module("site");
        assert_eq!(program.components[0].qualified_name(), "site_App");
    }

    #[test]
    fn test_root_defaults_to_main() {
        let program = Program {
            components: vec![Component {
                name: "Main".into(),
                ..Component::default()
            }],
            ..Program::default()
        };
        assert_eq!(program.root_component().map(|c| c.name.as_str()), Some("Main"));
    }
}
