//! A small interpreter for script rows.
//!
//! Rows are single statements (assignment, augmented assignment, `print`,
//! `pass`, expression statements such as `mutex.wait()`, one-line
//! `if <cond>: <stmt>`) or `if <cond>:` headers. The grammar is deliberately restricted: there are no loops,
//! function definitions or containers, only what semaphore exercises need.

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{BinOp, BoolOp, CmpOp, Const, Expr, Line, Stmt, UnaryOp};
pub use eval::exec_line;
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse_line, parse_statement};
