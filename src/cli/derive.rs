//! Вывод мастер-ключа из пароля и файла-ключа

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::Args;
use colored::Colorize;

use kdbx_crypto::crypto::{
    create_kdf_for, KdfParams, KeyDerivationFunction, SecureBytes, AES_KDF_UUID, ITERATIONS_PARAM,
    MEMORY_PARAM, PARALLELISM_PARAM, ROUNDS_PARAM,
};
use kdbx_crypto::{CompositeKey, CryptoError, Progress};

use super::{fingerprint, hash_key_file, load_params, prompt_password, resolve_kdf, run_with_progress};

#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// Функция вывода ключа: aes, argon2d, argon2id или UUID
    #[arg(long, env = "KDBX_CRYPTO_KDF", default_value = "argon2id")]
    pub kdf: String,

    /// JSON-файл с параметрами KDF (заменяет --kdf)
    #[arg(long, env = "KDBX_CRYPTO_PARAMS")]
    pub params: Option<PathBuf>,

    /// Число раундов AES-KDF или итераций Argon2
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Память Argon2 в МиБ
    #[arg(long)]
    pub memory_mib: Option<u64>,

    /// Параллелизм Argon2
    #[arg(long)]
    pub parallelism: Option<u32>,

    /// Файл-ключ
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Не запрашивать пароль (только файл-ключ)
    #[arg(long)]
    pub no_password: bool,

    /// Сгенерировать новую соль вместо сохранённой
    #[arg(long)]
    pub random_salt: bool,
}

pub fn run(args: DeriveArgs, progress: &Progress) -> anyhow::Result<()> {
    let (kdf, mut params) = match &args.params {
        Some(path) => {
            let params = load_params(path)?;
            let kdf = create_kdf_for(&params)
                .ok_or_else(|| anyhow!("в {} не указан известный KDF", path.display()))?;
            (kdf, params)
        }
        None => {
            let kdf = resolve_kdf(&args.kdf)?;
            let params = kdf.default_params();
            (kdf, params)
        }
    };

    apply_overrides(kdf.as_ref(), &mut params, &args)?;
    if args.random_salt {
        kdf.randomize(&mut params)?;
    }

    if args.no_password && args.key_file.is_none() {
        bail!("нужен пароль или файл-ключ");
    }
    let key_file_hash = args.key_file.as_deref().map(hash_key_file).transpose()?;
    let password = if args.no_password {
        None
    } else {
        Some(prompt_password()?)
    };

    let composite = CompositeKey::new(password.as_deref(), key_file_hash);
    drop(password);
    let key = composite.combine(None);

    println!("{} {}", "Функция:".cyan(), kdf.name());
    let (result, elapsed) = run_with_progress("Вывод ключа", progress, |progress| {
        kdf.transform(&key, &params, progress)
    });

    let print = report(result)?;
    println!("{} {} за {:.2?}", "Готово:".green().bold(), print, elapsed);
    Ok(())
}

/// Отпечаток выведенного ключа; прерывание считается ошибкой
fn report(result: Result<SecureBytes, CryptoError>) -> anyhow::Result<String> {
    match result {
        Ok(derived) => Ok(fingerprint(&derived)),
        Err(CryptoError::Cancelled(reason)) => bail!("вывод ключа прерван {}", reason),
        Err(err) => Err(err).context("вывод ключа не удался"),
    }
}

/// Перенести параметры командной строки в набор параметров KDF
fn apply_overrides(
    kdf: &dyn KeyDerivationFunction,
    params: &mut KdfParams,
    args: &DeriveArgs,
) -> anyhow::Result<()> {
    let is_aes = kdf.uuid() == AES_KDF_UUID;

    if let Some(iterations) = args.iterations {
        let key = if is_aes { ROUNDS_PARAM } else { ITERATIONS_PARAM };
        params.set_u64(key, iterations);
    }

    if is_aes && (args.memory_mib.is_some() || args.parallelism.is_some()) {
        bail!("--memory-mib и --parallelism применимы только к Argon2");
    }
    if let Some(memory_mib) = args.memory_mib {
        let bytes = memory_mib
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow!("слишком большой объём памяти: {} МиБ", memory_mib))?;
        params.set_u64(MEMORY_PARAM, bytes);
    }
    if let Some(parallelism) = args.parallelism {
        params.set_u32(PARALLELISM_PARAM, parallelism);
    }
    Ok(())
}
