// Re-export modules for the binary and tests

pub mod cmdext;
pub mod config;
pub mod context;
pub mod create;
pub mod destroy;
pub mod domain;
pub mod guest;
pub mod libvirt;
pub mod network;
pub mod provision;
pub mod qemu_img;
pub mod start;
pub mod state;
pub mod stop;
pub mod topology;
pub mod xml_utils;
