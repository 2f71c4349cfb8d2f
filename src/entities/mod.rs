//! Macros for declaring entities

mod macros;
