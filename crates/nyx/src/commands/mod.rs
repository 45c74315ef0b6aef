//! Command implementations

pub mod doctor;

pub mod infer;

pub mod info;

pub mod preflight;

pub mod release;
