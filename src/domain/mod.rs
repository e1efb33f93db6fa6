// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// system works with: labelled utterances, label vocabularies
// and decoded predictions.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// One utterance with its three labels, plus the padding variant
pub mod example;

// The three label dimensions and their vocabularies
pub mod label;

// The decoded per-example output written by `predict`
pub mod prediction;

// Core abstractions (traits) that other layers implement
pub mod traits;
