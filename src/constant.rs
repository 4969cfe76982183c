//! This module contains constants that are needed throughout the codebase.

/// The number of unsatisfiable guards that a single run may encounter before
/// it is aborted.
///
/// Crossing this ceiling means that the program cannot produce any further
/// valid tests under the current test variants.
pub const DEFAULT_GUARD_VIOLATION_CEILING: usize = 100;

/// The number of branch-set selections after which the greedy potential
/// strategy performs a linear scan for branches that reach uncovered nodes.
pub const DEFAULT_COVERAGE_SCAN_INTERVAL: usize = 50;

/// The number of consecutive selections without an accepted test after which
/// the greedy potential strategy falls back to purely random selection.
///
/// This guards against the strategy getting stuck in parser loops.
pub const DEFAULT_RANDOM_FALLBACK_THRESHOLD: usize = 1000;

/// The default maximum number of terminal branches that the linear
/// enumeration strategy records during construction.
pub const DEFAULT_LINEAR_ENUMERATION_BOUND: usize = 1000;

/// The default timeout for a single solver query, in milliseconds.
pub const DEFAULT_SOLVER_TIMEOUT_MS: u64 = 10_000;

/// The number of candidate assignments the enumerative solver may examine per
/// millisecond of its timeout before it reports `unknown`.
pub const ENUMERATIVE_SOLVER_ASSIGNMENTS_PER_MS: u64 = 100;

/// The default maximum number of tests a generator run emits, where zero
/// means unbounded.
pub const DEFAULT_MAX_TESTS: usize = 0;

/// The default value for whether unimplemented constructs abort the run.
pub const DEFAULT_STRICT_MODE_ENABLED: bool = false;

/// The default number of loop iterations a strategy will wait before polling
/// the watchdog.
pub const DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS: usize = 100;

/// The prefix given to the symbolic variables that are allocated when the
/// working packet is too short to satisfy an extraction.
pub const PACKET_VARIABLE_PREFIX: &str = "pkt_var";

/// The width of a byte in bits.
pub const BYTE_SIZE_BITS: usize = 8;

/// The widest bit-vector on which arithmetic can be performed.
pub const MAX_ARITHMETIC_WIDTH_BITS: usize = 256;

/// Bit-vector variables up to this width have their whole domain enumerated
/// by the enumerative solver, after the candidates mined from the query.
pub const ENUMERATIVE_SOLVER_FULL_DOMAIN_WIDTH_BITS: usize = 8;
