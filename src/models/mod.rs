pub mod task;
pub mod time_log;
pub mod views;
pub mod work_order;
pub mod worker;
