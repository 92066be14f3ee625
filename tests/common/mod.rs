#![allow(dead_code)]

pub mod sites;
