//! Tempo

pub mod jiffies;
