//! Host-supplied native functions installed into a fresh VM's globals.
//!
//! `clock()` is the one native `spec.md` §4.7 names. The reference
//! implementation returns process CPU time (`clock() / CLOCKS_PER_SEC`);
//! `std` has no equivalent primitive, so this measures wall-clock seconds
//! elapsed since the VM was constructed via `std::time::Instant`, the
//! same substitution the teacher's own timing natives make. Monotonicity
//! is the property an embedder actually depends on, and `Instant`
//! guarantees it.

use crate::vm::Vm;
use clockwork_core::Value;

pub fn install(vm: &mut Vm) {
    let start = vm.start_time();
    vm.define_native("clock", move |_args| Value::Number(start.elapsed().as_secs_f64()));
}
