//! UCI option declarations and `setoption` handling.

/// Print a UCI spin option.
fn print_spin(
    name: &str,
    default: impl std::fmt::Display,
    min: impl std::fmt::Display,
    max: impl std::fmt::Display,
) {
    println!("option name {name} type spin default {default} min {min} max {max}");
}

/// Print a UCI check option.
fn print_check(name: &str, default: bool) {
    println!("option name {name} type check default {default}");
}

/// Engine-side effect of a `setoption`, applied by the caller
pub enum UciAction {
    ResizeHash(usize),
    ClearTranspositionTable,
    ClearHistory,
    LoadNetwork(String),
    SetChess960(bool),
}

pub struct UciOptions {
    pub hash_mib: usize,
    pub threads: usize,
    pub multipv: u32,
    pub chess960: bool,
    pub move_overhead_ms: u64,
    pub ponder: bool,
    pub eval_file: String,
    pub enable_weird_tcs: bool,
}

impl Default for UciOptions {
    fn default() -> Self {
        UciOptions {
            hash_mib: 64,
            threads: 1,
            multipv: 1,
            chess960: false,
            move_overhead_ms: 20,
            ponder: false,
            eval_file: "<default>".to_string(),
            enable_weird_tcs: false,
        }
    }
}

impl UciOptions {
    pub fn print(&self) {
        print_spin("Hash", self.hash_mib, 1, 33_554_432_u32);
        print_spin("Threads", self.threads, 1, 1024);
        print_spin("MultiPV", self.multipv, 1, 218);
        print_spin("MoveOverhead", self.move_overhead_ms, 0, 30_000);
        print_check("UCI_Chess960", self.chess960);
        print_check("Ponder", self.ponder);
        print_check("EnableWeirdTCs", self.enable_weird_tcs);
        println!(
            "option name EvalFile type string default {}",
            self.eval_file
        );
        println!("option name TTClear type button");
        println!("option name HClear type button");
    }

    /// Apply one `setoption`. Unknown names return `Err` with a diagnostic;
    /// recognized options update the struct and may return an action for
    /// the engine to carry out.
    pub fn apply(&mut self, name: &str, value: Option<&str>) -> Result<Option<UciAction>, String> {
        match name.to_ascii_lowercase().as_str() {
            "hash" => {
                let mib = parse_clamped(value, 1, 33_554_432)? as usize;
                self.hash_mib = mib;
                Ok(Some(UciAction::ResizeHash(mib)))
            }
            "threads" => {
                self.threads = parse_clamped(value, 1, 1024)? as usize;
                Ok(None)
            }
            "multipv" => {
                self.multipv = parse_clamped(value, 1, 218)? as u32;
                Ok(None)
            }
            "moveoverhead" => {
                self.move_overhead_ms = parse_clamped(value, 0, 30_000)? as u64;
                Ok(None)
            }
            "uci_chess960" => {
                self.chess960 = parse_bool(value)?;
                Ok(Some(UciAction::SetChess960(self.chess960)))
            }
            "ponder" => {
                self.ponder = parse_bool(value)?;
                Ok(None)
            }
            "enableweirdtcs" => {
                self.enable_weird_tcs = parse_bool(value)?;
                Ok(None)
            }
            "evalfile" => {
                let path = value.unwrap_or("<default>").to_string();
                self.eval_file = path.clone();
                Ok(Some(UciAction::LoadNetwork(path)))
            }
            "ttclear" => Ok(Some(UciAction::ClearTranspositionTable)),
            "hclear" => Ok(Some(UciAction::ClearHistory)),
            other => Err(format!("unknown option '{other}'")),
        }
    }
}

fn parse_clamped(value: Option<&str>, min: i64, max: i64) -> Result<i64, String> {
    let raw = value.ok_or_else(|| "missing value".to_string())?;
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid number '{raw}'"))?;
    Ok(parsed.clamp(min, max))
}

fn parse_bool(value: Option<&str>) -> Result<bool, String> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        other => Err(format!("expected true/false, got '{}'", other.unwrap_or(""))),
    }
}
