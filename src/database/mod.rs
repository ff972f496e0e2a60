//! Typed tables: values, columns, schema inference, coercion and the relational store.

pub mod coercion;
pub mod column;
pub mod inference;
pub mod store;
pub mod table;
pub mod value;
