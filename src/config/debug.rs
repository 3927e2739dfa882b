//! Debugging feature flags.
//!
//! Toggle individual diagnostics here; keep them `false` by default so debug
//! builds stay readable. Every use site is additionally gated by
//! `cfg(debug_assertions)`.

pub struct DebugFlags {
    /// Emit every trendline that survives the touch filter.
    pub print_trendlines: bool,
    /// Emit consolidated levels with their merged sources.
    pub print_levels: bool,
    /// If non-empty, emit per-candidate zone scoring only for this symbol.
    /// Example: "AAPL". Use "" to disable.
    pub print_zone_scoring_for_symbol: &'static str,
    /// Emit the reason each entry model rejected a zone.
    pub print_entry_rejections: bool,
    /// Emit fetch attempts, retries and rate-gate waits.
    pub print_fetch_events: bool,
    /// Emit snapshot cache load/save details.
    pub print_serde: bool,
}

pub const DEBUG_FLAGS: DebugFlags = DebugFlags {
    print_trendlines: false,
    print_levels: false,
    print_zone_scoring_for_symbol: "",
    print_entry_rejections: false,
    print_fetch_events: false,
    print_serde: false,
};
