//! Value model, string table, and bytecode chunk shared by the Clockwork
//! compiler and virtual machine.
//!
//! - [`value`]: the tagged [`Value`](value::Value) union and the heap
//!   object variants it can reference.
//! - [`table`]: the open-addressed hash table used for both string
//!   interning and the VM's globals table.
//! - [`chunk`]: the growable bytecode byte-stream, its parallel line-number
//!   array, and its constant pool.

pub mod chunk;
pub mod table;
pub mod value;

pub use chunk::{Chunk, OpCode};
pub use table::Table;
pub use value::{Obj, ObjClosure, ObjFunction, ObjNative, ObjString, Value};
