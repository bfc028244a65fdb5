use core::arch::asm;

/// # Safety
///
/// The caller must hold I/O privilege for `port` and the write must be valid for the device
/// decoding it.
pub unsafe fn io_out_u32(port: u16, value: u32) {
    asm!("out dx, eax", in("dx") port, in("eax") value, options(nomem, nostack, preserves_flags));
}

/// # Safety
///
/// See [`io_out_u32`].
pub unsafe fn io_out_u8(port: u16, value: u8) {
    asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
}

/// # Safety
///
/// The caller must hold I/O privilege for `port`. Reads can have side effects on the device.
pub unsafe fn io_in_u32(port: u16) -> u32 {
    let value;

    asm!("in eax, dx", in("dx") port, out("eax") value, options(nomem, nostack, preserves_flags));

    value
}

/// # Safety
///
/// See [`io_in_u32`].
pub unsafe fn io_in_u8(port: u16) -> u8 {
    let value;

    asm!("in al, dx", in("dx") port, out("al") value, options(nomem, nostack, preserves_flags));

    value
}
