//! Paths - addressing collections, documents and properties with strings.
//!
//! ```text
//! /Orders                          every document in Orders
//! /Orders(abc)                     one document
//! /Orders(ObjectID("5f1d"))/total  a property of a document with an object id
//! /Orders(abc)/items[2]/sku        nested / indexed property
//! ?Customers(customerId)/name      lookup: follow Orders.customerId into Customers
//! ```

mod components;
mod resolver;
mod value;

pub use components::{DocumentId, PathComponents};
pub use resolver::{is_absolute, resolve};
pub use value::value_at;
