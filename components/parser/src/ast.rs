//! Abstract Syntax Tree node definitions
//!
//! Every node that can raise a runtime error carries the 1-based line it
//! starts on, relative to the parsed source.

use std::rc::Rc;

/// A parsed probe script
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements
    pub body: Vec<Statement>,
}

/// Probe language statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (let, const, var)
    VariableDeclaration {
        /// Declaration kind
        kind: VariableKind,
        /// List of declarators
        declarations: Vec<VariableDeclarator>,
        /// Source line
        line: u32,
    },

    /// Function declaration; hoisted to the top of its scope
    FunctionDeclaration(Rc<Function>),

    /// Expression statement
    ExpressionStatement {
        /// The expression
        expression: Expression,
        /// Source line
        line: u32,
    },

    /// Return statement
    ReturnStatement {
        /// Return value
        argument: Option<Expression>,
        /// Source line
        line: u32,
    },

    /// If statement
    IfStatement {
        /// Condition
        test: Expression,
        /// Consequent block
        consequent: Box<Statement>,
        /// Alternate block
        alternate: Option<Box<Statement>>,
    },

    /// While loop
    WhileStatement {
        /// Loop condition
        test: Expression,
        /// Loop body
        body: Box<Statement>,
    },

    /// C-style for loop
    ForStatement {
        /// Initialization
        init: Option<ForInit>,
        /// Condition
        test: Option<Expression>,
        /// Update expression
        update: Option<Expression>,
        /// Loop body
        body: Box<Statement>,
    },

    /// for...in loop over enumerable keys
    ForInStatement {
        /// Loop variable
        left: ForInOfLeft,
        /// Object to iterate over
        right: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source line
        line: u32,
    },

    /// for...of loop over array elements
    ForOfStatement {
        /// Loop variable
        left: ForInOfLeft,
        /// Array to iterate over
        right: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source line
        line: u32,
    },

    /// Break statement
    BreakStatement {
        /// Source line
        line: u32,
    },

    /// Continue statement
    ContinueStatement {
        /// Source line
        line: u32,
    },

    /// Throw statement
    ThrowStatement {
        /// Thrown value
        argument: Expression,
        /// Source line
        line: u32,
    },

    /// Try statement
    TryStatement {
        /// Protected block
        block: Vec<Statement>,
        /// Catch clause
        handler: Option<CatchClause>,
        /// Finally block
        finalizer: Option<Vec<Statement>>,
    },

    /// Block statement
    BlockStatement {
        /// Statements in the block
        body: Vec<Statement>,
    },

    /// Empty statement (`;`)
    EmptyStatement,
}

/// A function literal, declaration or arrow function.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Declared name
    pub name: Option<String>,
    /// Parameter names
    pub params: Vec<String>,
    /// Function body; arrow functions with an expression body get a single
    /// return statement
    pub body: Vec<Statement>,
    /// Line of the function keyword or parameter list
    pub line: u32,
}

/// Probe language expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Variable reference
    Identifier {
        /// Variable name
        name: String,
        /// Source line
        line: u32,
    },

    /// Literal value
    Literal(Literal),

    /// Array literal
    ArrayExpression {
        /// Elements
        elements: Vec<Expression>,
    },

    /// Object literal; keys keep source order
    ObjectExpression {
        /// Properties
        properties: Vec<(String, Expression)>,
    },

    /// Function expression or arrow function
    FunctionExpression(Rc<Function>),

    /// Unary operation
    UnaryExpression {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        argument: Box<Expression>,
        /// Source line
        line: u32,
    },

    /// `++`/`--`
    UpdateExpression {
        /// Operator
        operator: UpdateOperator,
        /// Prefix (`++x`) or postfix (`x++`)
        prefix: bool,
        /// Updated target
        argument: Box<AssignmentTarget>,
        /// Source line
        line: u32,
    },

    /// Binary operation
    BinaryExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: BinaryOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source line
        line: u32,
    },

    /// Short-circuiting operation
    LogicalExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: LogicalOperator,
        /// Right operand
        right: Box<Expression>,
    },

    /// `test ? consequent : alternate`
    ConditionalExpression {
        /// Condition
        test: Box<Expression>,
        /// Value when truthy
        consequent: Box<Expression>,
        /// Value when falsy
        alternate: Box<Expression>,
    },

    /// Assignment
    AssignmentExpression {
        /// Operator
        operator: AssignmentOperator,
        /// Target
        left: Box<AssignmentTarget>,
        /// Assigned value
        right: Box<Expression>,
        /// Source line
        line: u32,
    },

    /// Property access
    MemberExpression {
        /// Object
        object: Box<Expression>,
        /// Property
        property: MemberProperty,
        /// Source line
        line: u32,
    },

    /// Function call
    CallExpression {
        /// Callee
        callee: Box<Expression>,
        /// Arguments
        arguments: Vec<Expression>,
        /// Source line
        line: u32,
    },
}

/// Property of a member expression
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// `object.name`
    Identifier(String),
    /// `object[expr]`
    Computed(Box<Expression>),
}

/// Variable declaration kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// let declaration
    Let,
    /// const declaration
    Const,
    /// var declaration
    Var,
}

/// Variable declarator
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// Bound name
    pub id: String,
    /// Initial value
    pub init: Option<Expression>,
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Boolean
    Boolean(bool),
    /// Null
    Null,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// Addition or concatenation
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Modulo
    Mod,
    /// Equality
    Eq,
    /// Inequality
    NotEq,
    /// Strict equality
    StrictEq,
    /// Strict inequality
    StrictNotEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
    /// Property existence
    In,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Negate
    Minus,
    /// Plus (number conversion)
    Plus,
    /// Logical NOT
    Not,
    /// Typeof
    Typeof,
}

/// Update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// Increment
    Increment,
    /// Decrement
    Decrement,
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// Logical AND
    And,
    /// Logical OR
    Or,
    /// Nullish coalescing
    NullishCoalesce,
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// Simple assignment (=)
    Assign,
    /// Addition assignment (+=)
    AddAssign,
    /// Subtraction assignment (-=)
    SubAssign,
    /// Multiplication assignment (*=)
    MulAssign,
    /// Division assignment (/=)
    DivAssign,
    /// Modulo assignment (%=)
    ModAssign,
}

impl AssignmentOperator {
    /// The binary operator a compound assignment applies.
    pub fn binary(self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Assign => None,
            AssignmentOperator::AddAssign => Some(BinaryOperator::Add),
            AssignmentOperator::SubAssign => Some(BinaryOperator::Sub),
            AssignmentOperator::MulAssign => Some(BinaryOperator::Mul),
            AssignmentOperator::DivAssign => Some(BinaryOperator::Div),
            AssignmentOperator::ModAssign => Some(BinaryOperator::Mod),
        }
    }
}

/// Assignment target
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentTarget {
    /// Simple identifier
    Identifier(String),
    /// Property of an object or element of an array
    Member {
        /// Object
        object: Expression,
        /// Property
        property: MemberProperty,
    },
}

/// For loop initialization
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// Variable declaration
    VariableDeclaration {
        /// Kind
        kind: VariableKind,
        /// Declarations
        declarations: Vec<VariableDeclarator>,
    },
    /// Expression
    Expression(Expression),
}

/// Left side of for-in/for-of loop
#[derive(Debug, Clone, PartialEq)]
pub enum ForInOfLeft {
    /// Fresh binding per iteration (`let x`, `const x`, `var x`)
    VariableDeclaration {
        /// Kind
        kind: VariableKind,
        /// Bound name
        id: String,
    },
    /// Existing variable
    Identifier(String),
}

/// Catch clause
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// Parameter
    pub param: Option<String>,
    /// Body
    pub body: Vec<Statement>,
}
