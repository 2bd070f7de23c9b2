//! Список поддерживаемых алгоритмов

use colored::Colorize;

use kdbx_crypto::crypto::factory::{all_ciphers, all_kdfs};

pub fn run() -> anyhow::Result<()> {
    println!();
    println!("{}", "Функции вывода ключа:".cyan().bold());
    for kdf in all_kdfs() {
        println!("  {:<10} {}", kdf.name(), kdf.uuid().to_string().dimmed());
    }

    println!();
    println!("{}", "Шифры:".cyan().bold());
    for cipher in all_ciphers() {
        println!(
            "  {:<10} {}  ключ {} байт, IV {} байт",
            cipher.name(),
            cipher.uuid().to_string().dimmed(),
            cipher.key_size(),
            cipher.iv_size()
        );
    }
    println!();

    Ok(())
}
