pub mod agent;
pub mod approval;
pub mod decision;
pub mod session;
pub mod tooling;
pub mod workflow;
