//! Tuned search parameters.
//!
//! Kept in one struct so the values stay visible in one place and a search
//! instance can carry its own copy.

#[derive(Clone, Debug)]
pub struct SearchParams {
    /// Iteration depth after which aspiration windows kick in
    pub aspiration_min_depth: i32,
    /// Initial half-width of the aspiration window, in centipawns
    pub aspiration_window: i32,

    /// Maximum depth for reverse futility pruning
    pub rfp_max_depth: i32,
    /// RFP margin per remaining depth
    pub rfp_margin: i32,

    /// Minimum depth for null move pruning
    pub nmp_min_depth: i32,
    /// Base null move reduction
    pub nmp_base_reduction: i32,
    /// Extra reduction per this many plies of depth
    pub nmp_depth_divisor: i32,

    /// Maximum depth for futility pruning of quiets
    pub fp_max_depth: i32,
    /// Flat futility offset
    pub fp_offset: i32,
    /// Futility margin per depth unit
    pub fp_margin: i32,

    /// Late move pruning threshold: base + depth * depth moves
    pub lmp_base: usize,

    /// Maximum depth for SEE pruning in the main search
    pub see_pruning_max_depth: i32,
    /// SEE margin per depth for quiet moves
    pub see_quiet_margin: i32,
    /// SEE margin per depth for tactical moves
    pub see_tactical_margin: i32,

    /// Minimum depth to try a singular extension search
    pub singular_min_depth: i32,
    /// Margin per depth subtracted from the TT score for the singular beta
    pub singular_margin: i32,
    /// Fail distance that upgrades to a double extension (non-PV only)
    pub singular_double_margin: i32,
    /// Depth offset and divisor for the exclusion search
    pub singular_depth_offset: i32,

    /// Minimum depth for internal iterative reduction
    pub iir_min_depth: i32,

    /// History bonus scale per depth
    pub history_bonus_scale: i32,
    /// History bonus hard limit per update
    pub history_max_bonus: i32,
    /// LMR history divisor: reduction shrinks by score / this
    pub lmr_history_divisor: i32,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            aspiration_min_depth: 5,
            aspiration_window: 30,

            rfp_max_depth: 7,
            rfp_margin: 80,

            nmp_min_depth: 3,
            nmp_base_reduction: 3,
            nmp_depth_divisor: 3,

            fp_max_depth: 7,
            fp_offset: 100,
            fp_margin: 80,

            lmp_base: 4,

            see_pruning_max_depth: 8,
            see_quiet_margin: -60,
            see_tactical_margin: -30,

            singular_min_depth: 7,
            singular_margin: 2,
            singular_double_margin: 20,
            singular_depth_offset: 1,

            iir_min_depth: 4,

            history_bonus_scale: 170,
            history_max_bonus: 2_000,
            lmr_history_divisor: 8_000,
        }
    }
}
