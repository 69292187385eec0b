use std::process::exit;

fn main() {
    exit(vigil::uci::run_uci_loop());
}
