// src/core/scripting/mod.rs

pub mod interpreter_pool;

pub use interpreter_pool::InterpreterPool;
