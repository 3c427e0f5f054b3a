//! Static knowledge tables: well-known modules, Python builtins and
//! framework decorators that register entry points.

/// A module the missing-import detector knows how to suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownImport {
    /// The name as it appears at the use site (`json`, `np`).
    pub name: &'static str,
    /// Import statements to offer, most likely first.
    pub suggestions: &'static [&'static str],
}

pub const KNOWN_IMPORTS: &[KnownImport] = &[
    KnownImport { name: "json", suggestions: &["import json", "from json import loads, dumps"] },
    KnownImport { name: "os", suggestions: &["import os", "from os import path, environ"] },
    KnownImport { name: "sys", suggestions: &["import sys"] },
    KnownImport { name: "re", suggestions: &["import re"] },
    KnownImport { name: "time", suggestions: &["import time"] },
    KnownImport { name: "datetime", suggestions: &["import datetime", "from datetime import datetime, timedelta"] },
    KnownImport { name: "pathlib", suggestions: &["import pathlib", "from pathlib import Path"] },
    KnownImport { name: "logging", suggestions: &["import logging"] },
    KnownImport { name: "collections", suggestions: &["import collections", "from collections import defaultdict, Counter"] },
    KnownImport { name: "typing", suggestions: &["import typing", "from typing import Any, Optional"] },
    KnownImport { name: "requests", suggestions: &["import requests"] },
    KnownImport { name: "numpy", suggestions: &["import numpy as np", "import numpy"] },
    KnownImport { name: "np", suggestions: &["import numpy as np"] },
    KnownImport { name: "pandas", suggestions: &["import pandas as pd", "import pandas"] },
    KnownImport { name: "pd", suggestions: &["import pandas as pd"] },
    KnownImport { name: "tensorflow", suggestions: &["import tensorflow as tf", "import tensorflow"] },
    KnownImport { name: "torch", suggestions: &["import torch"] },
    KnownImport { name: "sklearn", suggestions: &["import sklearn"] },
    KnownImport { name: "matplotlib", suggestions: &["import matplotlib.pyplot as plt", "import matplotlib"] },
    KnownImport { name: "plt", suggestions: &["import matplotlib.pyplot as plt"] },
    KnownImport { name: "seaborn", suggestions: &["import seaborn as sns", "import seaborn"] },
    KnownImport { name: "flask", suggestions: &["import flask", "from flask import Flask, request"] },
    KnownImport { name: "django", suggestions: &["import django"] },
    KnownImport { name: "fastapi", suggestions: &["import fastapi", "from fastapi import FastAPI"] },
    KnownImport { name: "pydantic", suggestions: &["import pydantic", "from pydantic import BaseModel"] },
    KnownImport { name: "sqlalchemy", suggestions: &["import sqlalchemy", "from sqlalchemy import create_engine"] },
    KnownImport { name: "chromadb", suggestions: &["import chromadb"] },
    KnownImport { name: "mqtt", suggestions: &["import paho.mqtt.client as mqtt"] },
];

/// Import suggestions for an undefined name, if it is a well-known module.
///
/// Matching ignores ASCII case, so `JSON` finds the `json` entry.
///
/// # Examples
/// ```
/// # use common::wisdom::suggest_imports;
/// assert_eq!(suggest_imports("json").map(|s| s[0]), Some("import json"));
/// assert_eq!(suggest_imports("JSON").map(|s| s[0]), Some("import json"));
/// assert!(suggest_imports("undefined_name_xyz").is_none());
/// ```
pub fn suggest_imports(name: &str) -> Option<&'static [&'static str]> {
    KNOWN_IMPORTS
        .iter()
        .find(|known| known.name.eq_ignore_ascii_case(name))
        .map(|known| known.suggestions)
}

/// Names that are always bound in a Python module.
pub const PYTHON_BUILTINS: &[&str] = &[
    // constants and module attributes
    "True", "False", "None", "Ellipsis", "NotImplemented", "__name__", "__file__",
    "__doc__", "__package__", "__spec__", "__loader__", "__builtins__", "__debug__",
    "__path__", "__annotations__", "__dict__", "__class__", "__all__", "__version__",
    // functions
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "breakpoint", "callable",
    "chr", "compile", "delattr", "dir", "divmod", "enumerate", "eval", "exec", "exit",
    "filter", "format", "getattr", "globals", "hasattr", "hash", "help", "hex", "id",
    "input", "isinstance", "issubclass", "iter", "len", "locals", "map", "max", "min",
    "next", "oct", "open", "ord", "pow", "print", "quit", "repr", "reversed", "round",
    "setattr", "sorted", "sum", "vars", "zip", "__import__",
    // types
    "bool", "bytearray", "bytes", "classmethod", "complex", "dict", "float", "frozenset",
    "int", "list", "memoryview", "object", "property", "range", "set", "slice",
    "staticmethod", "str", "super", "tuple", "type",
    // exceptions
    "ArithmeticError", "AssertionError", "AttributeError", "BaseException",
    "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError", "BufferError",
    "BytesWarning", "ChildProcessError", "ConnectionAbortedError", "ConnectionError",
    "ConnectionRefusedError", "ConnectionResetError", "DeprecationWarning", "EOFError",
    "EnvironmentError", "Exception", "ExceptionGroup", "FileExistsError",
    "FileNotFoundError", "FloatingPointError", "FutureWarning", "GeneratorExit",
    "IOError", "ImportError", "ImportWarning", "IndentationError", "IndexError",
    "InterruptedError", "IsADirectoryError", "KeyError", "KeyboardInterrupt",
    "LookupError", "MemoryError", "ModuleNotFoundError", "NameError",
    "NotADirectoryError", "NotImplementedError", "OSError", "OverflowError",
    "PendingDeprecationWarning", "PermissionError", "ProcessLookupError",
    "RecursionError", "ReferenceError", "ResourceWarning", "RuntimeError",
    "RuntimeWarning", "StopAsyncIteration", "StopIteration", "SyntaxError",
    "SyntaxWarning", "SystemError", "SystemExit", "TabError", "TimeoutError",
    "TypeError", "UnboundLocalError", "UnicodeDecodeError", "UnicodeEncodeError",
    "UnicodeError", "UnicodeTranslateError", "UnicodeWarning", "UserWarning",
    "ValueError", "Warning", "ZeroDivisionError",
];

pub fn is_builtin(name: &str) -> bool {
    PYTHON_BUILTINS.contains(&name)
}

/// Decorator name patterns that mark a definition as externally invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoratorPattern {
    pub exact_matches: &'static [&'static str],
    /// Matched against the last dotted segment (`bp.route` matches `route`).
    pub suffix_matches: &'static [&'static str],
}

impl DecoratorPattern {
    pub fn matches(&self, decorator: &str) -> bool {
        if self.exact_matches.contains(&decorator) {
            return true;
        }
        match decorator.rsplit_once('.') {
            Some((_, last)) => self.suffix_matches.contains(&last),
            None => false,
        }
    }
}

/// Web routes, CLI commands, task queues, signal receivers and validators.
pub const FRAMEWORK_DECORATORS: DecoratorPattern = DecoratorPattern {
    exact_matches: &[
        "app.route", "app.get", "app.post", "app.put", "app.delete", "app.patch",
        "app.websocket", "router.get", "router.post", "router.put", "router.delete",
        "router.patch", "router.websocket", "click.command", "click.group",
        "app.command", "app.callback", "typer.command", "shared_task", "app.task",
        "celery.task", "receiver", "validator", "root_validator", "field_validator",
        "model_validator", "atexit.register", "app.on_event", "app.middleware",
        "app.exception_handler", "app.before_request", "app.after_request",
        "app.errorhandler", "register.filter", "register.simple_tag",
    ],
    suffix_matches: &[
        "route", "get", "post", "put", "delete", "patch", "websocket", "command",
        "group", "task", "on_event", "listens_for", "hookimpl",
    ],
};

/// pytest fixture markers.
pub const PYTEST_DECORATORS: DecoratorPattern = DecoratorPattern {
    exact_matches: &["pytest.fixture", "fixture", "pytest_asyncio.fixture"],
    suffix_matches: &[],
};
