pub mod allocator;
pub mod planning;

pub use allocator::{allocate, allocate_with, preview_allocation, AllocationRequest, PeriodAllocation};
pub use planning::{plan_payment, PaymentPlan, PaymentSubmission};
