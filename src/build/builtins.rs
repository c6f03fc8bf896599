//! Names the runtime provides without a declaration.
//!
//! Builtins never have a body in the program. Calls and reads resolve to extern values,
//! which downstream analyses treat as sources and sinks.

use crate::ssa::ConstValue;

/// Superglobal variables, without `$`.
pub const SUPERGLOBALS: &[&str] = &[
    "_GET", "_POST", "_COOKIE", "_SESSION", "_SERVER", "_REQUEST", "_FILES", "_ENV", "GLOBALS",
];

/// Builtin functions, lowercased.
pub const FUNCTIONS: &[&str] = &[
    // output
    "echo",
    "print",
    "printf",
    "sprintf",
    "var_dump",
    "var_export",
    "print_r",
    // process and code execution
    "system",
    "exec",
    "shell_exec",
    "passthru",
    "popen",
    "proc_open",
    "eval",
    "assert",
    "include",
    "call_user_func",
    "call_user_func_array",
    // strings
    "strlen",
    "strtolower",
    "strtoupper",
    "str_replace",
    "substr",
    "strpos",
    "trim",
    "implode",
    "explode",
    "htmlspecialchars",
    "addslashes",
    "json_encode",
    "json_decode",
    "base64_encode",
    "base64_decode",
    "md5",
    "sha1",
    "intval",
    "strval",
    // arrays
    "count",
    "array_merge",
    "array_keys",
    "array_values",
    "array_map",
    "array_filter",
    "in_array",
    "is_array",
    "is_string",
    "is_int",
    "is_null",
    "isset",
    "empty",
    "unset",
    // files and network
    "file_get_contents",
    "file_put_contents",
    "fopen",
    "fread",
    "fwrite",
    "unlink",
    "header",
    "setcookie",
    "mysqli_query",
    // runtime
    "define",
    "defined",
    "constant",
    "function_exists",
    "class_exists",
    "exit",
    "die",
    "clone",
];

/// Builtin classes and interfaces.
pub const CLASSES: &[&str] = &[
    "stdClass",
    "Exception",
    "Error",
    "ErrorException",
    "TypeError",
    "RuntimeException",
    "LogicException",
    "InvalidArgumentException",
    "Throwable",
    "Traversable",
    "Iterator",
    "IteratorAggregate",
    "ArrayAccess",
    "Countable",
    "JsonSerializable",
    "Stringable",
    "ArrayObject",
    "ArrayIterator",
    "Closure",
    "Generator",
    "DateTime",
    "PDO",
];

/// Returns `true` if `name` is a builtin function (case-insensitive).
#[must_use]
pub fn is_function(name: &str) -> bool {
    FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

/// Returns the canonical spelling of a builtin class (case-insensitive).
#[must_use]
pub fn class(name: &str) -> Option<&'static str> {
    CLASSES.iter().copied().find(|c| c.eq_ignore_ascii_case(name))
}

/// Returns the value of a builtin constant.
#[must_use]
pub fn constant(name: &str) -> Option<ConstValue> {
    let value = match name {
        "PHP_EOL" => ConstValue::String("\n".to_string()),
        "PHP_INT_MAX" => ConstValue::Int(i64::MAX),
        "PHP_INT_MIN" => ConstValue::Int(i64::MIN),
        "PHP_INT_SIZE" => ConstValue::Int(8),
        "PHP_FLOAT_EPSILON" => ConstValue::Float(f64::EPSILON),
        "PHP_OS" => ConstValue::String("Linux".to_string()),
        "DIRECTORY_SEPARATOR" => ConstValue::String("/".to_string()),
        "M_PI" => ConstValue::Float(std::f64::consts::PI),
        "E_ALL" => ConstValue::Int(32767),
        "E_ERROR" => ConstValue::Int(1),
        "E_WARNING" => ConstValue::Int(2),
        "E_NOTICE" => ConstValue::Int(8),
        "SORT_STRING" => ConstValue::Int(2),
        "ENT_QUOTES" => ConstValue::Int(3),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(is_function("STRLEN"));
        assert!(!is_function("my_helper"));
        assert_eq!(class("exception"), Some("Exception"));
        assert_eq!(class("Nope"), None);
        assert_eq!(constant("PHP_INT_SIZE"), Some(ConstValue::Int(8)));
        assert_eq!(constant("php_eol"), None);
        assert!(SUPERGLOBALS.contains(&"_GET"));
    }
}
