// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

pub mod zone;
pub mod partition;
pub mod output;
pub mod system;

pub use zone::{Zone, ZoneStatus};
pub use partition::{Partition, PartitionStatus};
pub use output::{Output, OutputStatus};
pub use system::DeviceInfo;
