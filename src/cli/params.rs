//! Вывод параметров KDF по умолчанию в JSON

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use colored::Colorize;

use super::resolve_kdf;

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Функция вывода ключа: aes, argon2d, argon2id или UUID
    #[arg(long, env = "KDBX_CRYPTO_KDF", default_value = "argon2id")]
    pub kdf: String,

    /// Оставить нулевую соль (по умолчанию генерируется случайная)
    #[arg(long)]
    pub zero_salt: bool,

    /// Записать в файл вместо stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run(args: ParamsArgs) -> anyhow::Result<()> {
    let kdf = resolve_kdf(&args.kdf)?;
    let mut params = kdf.default_params();
    if !args.zero_salt {
        kdf.randomize(&mut params)?;
    }

    let json = serde_json::to_string_pretty(&params)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json + "\n")
                .with_context(|| format!("не удалось записать {}", path.display()))?;
            println!("{} {}", "Параметры сохранены в".green(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
