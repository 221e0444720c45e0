use std::process::exit;

use zkfacade::format_fail;
use zkfacade::run;

fn main() {
    if let Err(error) = run() {
        let message = format_fail(&error);
        eprintln!("{}", message);
        exit(1);
    }
}
