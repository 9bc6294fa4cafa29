//! Single-hart critical section: clear mstatus.MIE, restore it on release

use core::arch::asm;

struct SingleHart;

critical_section::set_impl!(SingleHart);

const MSTATUS_MIE: usize = 1 << 3;

unsafe impl critical_section::Impl for SingleHart {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mstatus: usize;
        asm!("csrrci {}, mstatus, 0b1000", out(reg) mstatus);
        mstatus & MSTATUS_MIE != 0
    }

    unsafe fn release(was_active: critical_section::RawRestoreState) {
        if was_active {
            asm!("csrsi mstatus, 0b1000");
        }
    }
}
