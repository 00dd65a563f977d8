// This file is the module declaration file for the `core` module.
// In Rust, a `mod.rs` file within a directory (e.g., `src/core/`)
// serves two main purposes:
//
// 1. It declares the submodules contained within that directory.
// 2. It exposes these submodules to the parent module (`src/` in this case),
//    making them accessible to the entire crate.

// The `pub mod config;` declaration tells the Rust compiler to look for
// a file named `config.rs` (or `config/mod.rs`) within the same directory.
// The `pub` keyword makes the `config` module and all its public items
// (structs, functions, traits) available to the parent crate.
//
// `config` module:
// This module is responsible for managing the application's configuration.
// It defines the data structures for the configuration file (`ExtractorConfig`),
// provides a `ConfigProvider` trait for abstracting configuration access, and
// includes a `ConfigManager` to handle loading, saving and validating TOML or
// YAML configuration files.
pub mod config;

// `engine` module:
// Runs the extraction pipeline over every configured repository root and
// collects the records together with a per-root report.
pub mod engine;

// `walker` module:
// Lazily enumerates candidate source files below a root, pruning hidden and
// excluded directories.
pub mod walker;
