use thiserror::Error;

use crate::ssa::{BlockId, FunctionId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all fatal errors this library can
/// return.
///
/// Only conditions that make a whole build unit unusable are reported through this type.
/// Undefined symbols, duplicate classes, unterminated blocks and similar problems are
/// accumulated as [`crate::ssa::Diagnostic`] entries on the [`crate::ssa::Program`] instead,
/// so a build keeps producing the most complete program it can.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::EmptyTree`] - No parse tree was handed to the builder
/// - [`Error::Unparseable`] - The parse tree carries parser errors and partial trees are disabled
///
/// ## Construction Errors
/// - [`Error::Malformed`] - An internal construction invariant was broken
/// - [`Error::FunctionFinished`] - Attempted to append to a frozen function
/// - [`Error::InvalidFunction`] - A function id does not belong to the program
/// - [`Error::InvalidBlock`] - A block id does not belong to the function
/// - [`Error::UnbalancedFunctionStack`] - `pop_function` without a matching push
///
/// ## Workspace Errors
/// - [`Error::DuplicateUnit`] - A unit with the same name was already built
/// - [`Error::LockError`] - Thread synchronization failure
///
/// # Examples
///
/// ```rust
/// use phpscope::{build::Builder, Error};
///
/// match Builder::new().build(None) {
///     Err(Error::EmptyTree) => println!("nothing to build"),
///     Err(e) => eprintln!("build failed: {}", e),
///     Ok(program) => println!("{} functions", program.function_count()),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// No parse tree was provided for the build unit.
    #[error("No parse tree was provided")]
    EmptyTree,

    /// The parse tree contains parser error nodes and partial trees are not allowed.
    ///
    /// Raised only when [`crate::build::BuildConfig::allow_partial_tree`] is disabled.
    #[error("Unit '{unit}' could not be parsed ({errors} parser errors)")]
    Unparseable {
        /// Name of the unit that failed
        unit: String,
        /// Number of parser errors reported on the tree
        errors: usize,
    },

    /// An internal construction invariant was broken.
    ///
    /// The error includes the source location where the condition was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An instruction or block was appended after the function was finished.
    #[error("Function {0} is already finished")]
    FunctionFinished(FunctionId),

    /// The function id does not exist in this program.
    #[error("Invalid function {0}")]
    InvalidFunction(FunctionId),

    /// The block id does not exist in the function.
    #[error("Invalid block {block} in function {function}")]
    InvalidBlock {
        /// Function that was addressed
        function: FunctionId,
        /// Block that was requested
        block: BlockId,
    },

    /// `pop_function` was called without a matching `push_function`.
    #[error("Function stack is unbalanced")]
    UnbalancedFunctionStack,

    /// A unit with this name has already been registered in the workspace.
    #[error("Unit '{0}' already exists in the workspace")]
    DuplicateUnit(String),

    /// Failed to lock a shared resource.
    #[error("{0}")]
    LockError(String),
}
