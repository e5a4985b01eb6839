mod captured_logs;
mod ptr_server_mock;

pub use captured_logs::CapturedLogs;
pub use ptr_server_mock::{MockPtrServer, PtrAnswer};
