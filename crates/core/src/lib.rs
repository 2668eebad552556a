pub mod common;
pub mod config;

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod notify {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod signal {
    pub mod entity;
    pub mod error;
}
