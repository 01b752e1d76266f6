//! A small dense feed-forward network engine.
//!
//! `feedforward` is a from-scratch implementation of a fully connected
//! sigmoid network on top of its own `f64` matrix engine: forward inference,
//! per-sample backpropagation, an approximate generative inverse, and model
//! persistence in raw binary, text, and JSON forms.
//!
//! # Design goals
//!
//! - Clear contracts: shapes are explicit and every cross-shape operation is
//!   checked at the API boundary.
//! - Reproducibility: construction takes a seed or a caller-supplied RNG, and
//!   the matrix product accumulates in a fixed order.
//! - Faithful numerics: the backward pass applies its in-place, sequential
//!   update order as a pinned behavioral contract (see [`network`]).
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - [`Matrix`] stores elements contiguously in row-major layout.
//! - Weight matrix `i` has shape `(topology[i + 1], topology[i])`.
//! - Samples are column vectors, built with [`Matrix::column`].
//!
//! # Quick start
//!
//! ```rust
//! use feedforward::{Matrix, Network};
//!
//! # fn main() -> feedforward::Result<()> {
//! // XOR, with inputs and targets mapped onto the 0.01/0.99 convention.
//! let pairs: [([f64; 2], f64); 4] = [
//!     ([0.01, 0.01], 0.01),
//!     ([0.01, 0.99], 0.99),
//!     ([0.99, 0.01], 0.99),
//!     ([0.99, 0.99], 0.01),
//! ];
//!
//! let mut net = Network::new_with_seed(&[2, 4, 1], 0.3, 0)?;
//! for _ in 0..500 {
//!     for (input, target) in &pairs {
//!         net.train(&Matrix::column(input), &Matrix::column(&[*target]))?;
//!     }
//! }
//!
//! let out = net.query(&Matrix::column(&[0.01, 0.99]))?;
//! let y = out.get(0, 0)?;
//! assert!(y > 0.0 && y < 1.0); // sigmoid range
//! # Ok(())
//! # }
//! ```
//!
//! # Persistence
//!
//! ```rust,no_run
//! use feedforward::Network;
//!
//! # fn main() -> feedforward::Result<()> {
//! let net = Network::new_with_seed(&[784, 100, 10], 0.1, 0)?;
//! net.save("digits.rwm")?; // raw binary; "digits.ftm" would be text
//! let restored = Network::load("digits.rwm")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod matrix;
pub mod model;
pub mod network;

pub use error::{Error, Result};
pub use matrix::Matrix;
pub use model::{Format, Model};
pub use network::Network;
