use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub start_index: usize,
    pub end_index: usize,
}

pub trait HasMeta {
    fn get_meta(&self) -> &Meta;
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierData {
    pub name: String,
    pub meta: Meta,
}

#[derive(Debug)]
pub struct ProgramData {
    pub meta: Meta,
    pub strict: bool,
    pub body: Vec<StatementType>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariableDeclarationKind {
    Var,
    Let,
    Const,
}

#[derive(Debug)]
pub struct VariableDeclaratorData {
    pub meta: Meta,
    pub id: IdentifierData,
    pub init: Option<Box<ExpressionType>>,
}

#[derive(Debug)]
pub enum StatementType {
    EmptyStatement {
        meta: Meta,
    },
    ExpressionStatement {
        meta: Meta,
        expression: Box<ExpressionType>,
    },
    ThrowStatement {
        meta: Meta,
        argument: Box<ExpressionType>,
    },
    VariableDeclaration {
        meta: Meta,
        kind: VariableDeclarationKind,
        declarations: Vec<VariableDeclaratorData>,
    },
}
impl HasMeta for StatementType {
    fn get_meta(&self) -> &Meta {
        match self {
            StatementType::EmptyStatement { meta } => meta,
            StatementType::ExpressionStatement { meta, .. } => meta,
            StatementType::ThrowStatement { meta, .. } => meta,
            StatementType::VariableDeclaration { meta, .. } => meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    NullLiteral,
    BooleanLiteral(bool),
    StringLiteral(String),
    NumberLiteral(NumberLiteralType),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumberLiteralType {
    IntegerLiteral(i64),
    FloatLiteral(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Minus,
    Plus,
    LogicalNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    StrictlyEqual,
    StrictlyUnequal,
    LooselyEqual,
    LooselyUnequal,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    Add,
    Subtract,
    InstanceOf,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug)]
pub enum MemberProperty {
    Dot(String),
    Computed(Box<ExpressionType>),
}

#[derive(Debug)]
pub enum PropertyName {
    Static(String),
    Computed(Box<ExpressionType>),
}

#[derive(Debug)]
pub struct PropertyData {
    pub meta: Meta,
    pub key: PropertyName,
    pub value: ExpressionType,
}

/// Arrow functions only: lexical `this`, an expression body, no `arguments`.
#[derive(Debug)]
pub struct FunctionData {
    pub meta: Meta,
    pub params: Vec<IdentifierData>,
    pub body: Box<ExpressionType>,
}

#[derive(Debug)]
pub enum ExpressionType {
    Literal {
        meta: Meta,
        value: LiteralType,
    },
    Identifier(IdentifierData),
    ThisExpression {
        meta: Meta,
    },
    ArrayExpression {
        meta: Meta,
        elements: Vec<ExpressionType>,
    },
    ObjectExpression {
        meta: Meta,
        properties: Vec<PropertyData>,
    },
    MemberExpression {
        meta: Meta,
        object: Box<ExpressionType>,
        property: MemberProperty,
    },
    CallExpression {
        meta: Meta,
        callee: Box<ExpressionType>,
        arguments: Vec<ExpressionType>,
    },
    NewExpression {
        meta: Meta,
        callee: Box<ExpressionType>,
        arguments: Vec<ExpressionType>,
    },
    ArrowFunctionExpression(Rc<FunctionData>),
    UnaryExpression {
        meta: Meta,
        operator: UnaryOperator,
        argument: Box<ExpressionType>,
    },
    BinaryExpression {
        meta: Meta,
        operator: BinaryOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    LogicalExpression {
        meta: Meta,
        operator: LogicalOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    AssignmentExpression {
        meta: Meta,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
}
impl HasMeta for ExpressionType {
    fn get_meta(&self) -> &Meta {
        match self {
            ExpressionType::Literal { meta, .. } => meta,
            ExpressionType::Identifier(data) => &data.meta,
            ExpressionType::ThisExpression { meta } => meta,
            ExpressionType::ArrayExpression { meta, .. } => meta,
            ExpressionType::ObjectExpression { meta, .. } => meta,
            ExpressionType::MemberExpression { meta, .. } => meta,
            ExpressionType::CallExpression { meta, .. } => meta,
            ExpressionType::NewExpression { meta, .. } => meta,
            ExpressionType::ArrowFunctionExpression(f) => &f.meta,
            ExpressionType::UnaryExpression { meta, .. } => meta,
            ExpressionType::BinaryExpression { meta, .. } => meta,
            ExpressionType::LogicalExpression { meta, .. } => meta,
            ExpressionType::AssignmentExpression { meta, .. } => meta,
        }
    }
}
