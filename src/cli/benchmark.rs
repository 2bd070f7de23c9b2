//! Подбор числа итераций под заданное время вывода ключа
//!
//! KDF запускается с заведомо избыточным числом итераций и отменяется по таймеру;
//! по счётчику прогресса видно, сколько итераций успело пройти.

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Args;
use colored::Colorize;

use kdbx_crypto::crypto::{
    random_bytes, SecureBytes, AES_KDF_UUID, ITERATIONS_PARAM, KEY_LEN, MEMORY_PARAM,
    PARALLELISM_PARAM, ROUNDS_PARAM,
};
use kdbx_crypto::{CancellationReason, CryptoError, Progress};

use super::{resolve_kdf, run_with_progress};

/// Верхняя граница раундов AES-KDF для замера
const AES_PROBE_ROUNDS: u64 = u64::MAX / 2;
/// Верхняя граница итераций Argon2 для замера
const ARGON_PROBE_ITERATIONS: u64 = 1_000_000;

#[derive(Args, Debug)]
pub struct BenchmarkArgs {
    /// Функция вывода ключа: aes, argon2d, argon2id или UUID
    #[arg(long, env = "KDBX_CRYPTO_KDF", default_value = "aes")]
    pub kdf: String,

    /// Желаемое время вывода ключа в секундах
    #[arg(long, default_value_t = 1.0)]
    pub seconds: f64,

    /// Память Argon2 в МиБ
    #[arg(long, default_value_t = 64)]
    pub memory_mib: u64,

    /// Параллелизм Argon2
    #[arg(long, default_value_t = 2)]
    pub parallelism: u32,
}

pub fn run(args: BenchmarkArgs, progress: &Progress) -> anyhow::Result<()> {
    if !(args.seconds.is_finite() && args.seconds > 0.0) {
        bail!("время должно быть положительным числом секунд");
    }
    let target = Duration::from_secs_f64(args.seconds);

    let kdf = resolve_kdf(&args.kdf)?;
    let mut params = kdf.default_params();
    kdf.randomize(&mut params)?;
    if kdf.uuid() == AES_KDF_UUID {
        params.set_u64(ROUNDS_PARAM, AES_PROBE_ROUNDS);
    } else {
        params.set_u64(ITERATIONS_PARAM, ARGON_PROBE_ITERATIONS);
        params.set_u64(MEMORY_PARAM, args.memory_mib.saturating_mul(1024 * 1024));
        params.set_u32(PARALLELISM_PARAM, args.parallelism);
    }
    let key = SecureBytes::new(random_bytes(KEY_LEN)?);

    let timer = progress.clone();
    thread::spawn(move || {
        thread::sleep(target);
        timer.cancel(CancellationReason::UserRequested);
    });

    println!("{} {} ({:.1} с)", "Замер:".cyan(), kdf.name(), args.seconds);
    let (result, elapsed) = run_with_progress("Замер", progress, |progress| {
        kdf.transform(&key, &params, progress)
    });

    match result {
        Err(CryptoError::Cancelled(_)) => {}
        Ok(_) => bail!("замер завершился раньше таймера"),
        Err(err) => return Err(err).context("замер не удался"),
    }
    if elapsed < target.mul_f64(0.9) {
        println!("{}", "Замер прерван.".yellow());
        return Ok(());
    }

    let completed = progress.completed_unit_count();
    let suggested = scale_to_target(completed, elapsed, target);
    println!(
        "{} {} итераций за {:.2?}",
        "Выполнено:".green().bold(),
        completed,
        elapsed
    );
    println!(
        "{} {} итераций на {:.1} с",
        "Рекомендация:".green().bold(),
        suggested,
        args.seconds
    );
    Ok(())
}

/// Сколько итераций уложится в `target`, если `completed` заняли `elapsed`
fn scale_to_target(completed: u64, elapsed: Duration, target: Duration) -> u64 {
    if elapsed.is_zero() {
        return completed.max(1);
    }
    let rate = completed as f64 / elapsed.as_secs_f64();
    ((rate * target.as_secs_f64()) as u64).max(1)
}
