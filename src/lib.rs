//! # Introduction
//!
//! `emc` is a whole-program compiler front end for Em, a small C-family
//! imperative language: primitive scalars, strings, functions, and control
//! flow, with no pointers, arrays, or structs.
//!
//! ## Compilation pipeline
//!
//! ```text
//! Source → Lexer → Token Stream → Parser → AST → IR Emitter → LLIR Module
//! ```
//!
//! 1. [`parser`] — tokenises the source (resolving `#import` inclusions) and
//!    builds an arena-backed AST by precedence climbing.
//! 2. [`symtab`] — lexical scopes plus the per-unit function and prototype
//!    tables the parser checks declarations against.
//! 3. [`emitter`] — walks the AST and lowers it into an [`llir`] module:
//!    stack slots in function entry blocks, short-circuit logic via phi
//!    merges, loops with explicit condition/body/increment blocks.
//! 4. [`llir`] — the target-agnostic IR: functions of labeled basic blocks,
//!    each ending in exactly one terminator, plus globals and interned
//!    string literals, with verification and a textual form.
//! 5. [`driver`] — the per-file pipeline handed to the `emc` binary.
//!
//! Compilation is single-threaded and strictly sequential per translation
//! unit; the first error aborts with source context (see [`error`]).

pub mod driver;
pub mod emitter;
pub mod error;
pub mod llir;
pub mod parser;
pub mod symtab;
