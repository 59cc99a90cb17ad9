use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "petition-server", about = "Petition signing web service")]
pub struct Opt {
    /// Config file path
    #[arg(short, long, value_parser, default_value = "config.toml")]
    pub config: clio::Input,
}
