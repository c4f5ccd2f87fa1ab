//! Binary that emits command-line options markdown to stdout.
//!
//! Pipe it into the command-line options reference when flags change.

fn main() {
    print!("{}", tabula_cli::render_options_markdown());
}
