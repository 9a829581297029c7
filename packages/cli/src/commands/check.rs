use anyhow::Result;
use clap::Args;
use colored::Colorize;
use minibind_parser::{analyze, parse_each, AnalyzeOptions};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Expression text, as written in a binding attribute
    pub expression: String,

    /// Treat the text as an `:each` header
    #[arg(long)]
    pub each: bool,
}

pub fn check(args: CheckArgs) -> Result<()> {
    let source = if args.each {
        match parse_each(&args.expression) {
            Ok(header) => {
                println!("   item:     {}", header.item);
                if let Some(index) = &header.index {
                    println!("   index:    {}", index);
                }
                header.iterable_source
            }
            Err(error) => {
                eprint!("{}", error.render());
                return Err(anyhow::anyhow!("invalid :each header"));
            }
        }
    } else {
        args.expression
    };

    match analyze(&source, &AnalyzeOptions::default()) {
        Ok(identifiers) => {
            println!("{} {}", "✓".green(), source.bright_white());
            print_names("referenced", &identifiers.referenced);
            print_names("member", &identifiers.member);
            print_names("assigned", &identifiers.assigned);
            Ok(())
        }
        Err(error) => {
            eprint!("{}", error.render());
            Err(anyhow::anyhow!("invalid expression"))
        }
    }
}

fn print_names(label: &str, names: &[String]) {
    if !names.is_empty() {
        println!("   {:<10}{}", format!("{}:", label), names.join(", "));
    }
}
