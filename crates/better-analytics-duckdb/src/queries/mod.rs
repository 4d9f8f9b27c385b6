pub mod dashboards;
pub mod funnels;
