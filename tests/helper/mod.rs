//! Shared test utilities

#![allow(dead_code)]

pub mod hosts;

pub use hosts::*;
