pub mod dao;
pub mod gri;
pub mod network;
pub mod proposal;
