/// Issues a CPU-level "this is a spin loop" hint (`PAUSE` on x86, `YIELD` on
/// aarch64, ...). Does not involve the OS scheduler and never blocks.
#[inline]
pub fn yield_cpu() {
    std::hint::spin_loop();
}

/// Asks the OS scheduler to run some other ready thread on this core, if one
/// exists. Unlike [`yield_cpu`] this can cost a full scheduling quantum.
#[inline]
pub fn yield_thread() {
    std::thread::yield_now();
}
