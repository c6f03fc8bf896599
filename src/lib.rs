// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # phpscope
//!
//! A library that lowers PHP parse trees into Static Single Assignment (SSA) form for
//! static analysis.
//!
//! ## Features
//!
//! - **Single-pass construction** - variables are versioned on the fly while the tree is
//!   walked, with phi nodes at control-flow joins
//! - **Nested functions** - functions, methods, closures and arrow functions are built as
//!   independent SSA functions; closures capture through their parent scope
//! - **Classes** - classes, interfaces and traits become blueprints whose inherited
//!   members are merged once the unit is complete
//! - **Namespaces** - every namespace is a library with its own classes, functions and
//!   constants, and an `init` function for its top-level code
//! - **Tolerant** - missing nodes and undefined names are diagnostics, not failures
//! - **Concurrent** - independent units build in parallel in a [`workspace::Workspace`]
//!
//! ## Quick Start
//!
//! ```rust
//! use phpscope::prelude::*;
//!
//! // if ($c) { $x = 1; } else { $x = 2; } echo $x;
//! let file = SourceFile::new(
//!     "index.php",
//!     vec![
//!         Stmt::if_else(
//!             Expr::var("c"),
//!             vec![Stmt::expr(Expr::assign(Expr::var("x"), Expr::int(1)))],
//!             Some(vec![Stmt::expr(Expr::assign(Expr::var("x"), Expr::int(2)))]),
//!         ),
//!         Stmt::echo(vec![Expr::var("x")]),
//!     ],
//! );
//!
//! let program = Builder::new().build(Some(&file))?;
//! let main = program.main_function();
//! assert_eq!(main.phi_count(), 1);
//! # Ok::<(), phpscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`syntax`] - the parse tree a front end hands to the builder
//! - [`ssa`] - the intermediate representation: types, values, blocks, functions,
//!   blueprints, libraries and the [`ssa::Program`] container
//! - [`build`] - the driver that walks a tree and produces a program
//! - [`workspace`] - several units, built concurrently, resolving against each other
//! - [`prelude`] - re-exports of the commonly used types
//!
//! ## Error Handling
//!
//! Problems in the analysed code are recorded as [`ssa::Diagnostic`]s on the program.
//! Only a missing tree, a rejected partial tree or a broken internal invariant is an
//! [`Error`]:
//!
//! ```rust
//! use phpscope::{build::Builder, Error};
//!
//! match Builder::new().build(None) {
//!     Err(Error::EmptyTree) => {}
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger. Per-node
//! dispatch is logged at `trace`, SSA construction events at `debug`, and every warning
//! diagnostic is mirrored at `warn`.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust
/// use phpscope::prelude::*;
///
/// let program = Builder::new().build(Some(&SourceFile::new("a.php", vec![])))?;
/// assert_eq!(program.main_function().kind(), FunctionKind::Main);
/// # Ok::<(), phpscope::Error>(())
/// ```
pub mod prelude;

/// The parse-tree contract: expressions, statements, declarations and spans.
pub mod syntax;

/// SSA intermediate representation and the function builder.
pub mod ssa;

/// Lowering of parse trees into programs.
pub mod build;

/// Multi-unit builds over frozen programs.
pub mod workspace;

/// `phpscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `phpscope` Error type
///
/// The main error type for all fatal conditions in this crate. Recoverable problems in
/// the analysed code are [`ssa::Diagnostic`]s instead.
pub use error::Error;
