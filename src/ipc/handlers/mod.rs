pub mod attendance;
pub mod backup;
pub mod core;
pub mod dashboards;
pub mod marks;
pub mod roster;
pub mod seed;
pub mod session;
