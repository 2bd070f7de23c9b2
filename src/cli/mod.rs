//! Реализация CLI команд

pub mod algorithms;
pub mod benchmark;
pub mod derive;
pub mod params;

use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use sha2::{Digest, Sha256};

use kdbx_crypto::crypto::factory::all_kdfs;
use kdbx_crypto::crypto::{KdfParams, KeyDerivationFunction, SecureBytes, Uuid};
use kdbx_crypto::{CryptoError, Progress};

/// Интервал обновления индикатора прогресса
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Найти KDF по имени ("aes", "argon2d", "argon2id") или по UUID
pub fn resolve_kdf(name: &str) -> anyhow::Result<Box<dyn KeyDerivationFunction>> {
    if let Ok(uuid) = name.parse::<Uuid>() {
        return kdbx_crypto::crypto::create_kdf(&uuid)
            .ok_or_else(|| anyhow!("неизвестный UUID функции вывода ключа: {}", uuid));
    }

    let wanted = normalize(name);
    all_kdfs()
        .into_iter()
        .find(|kdf| {
            let known = normalize(kdf.name());
            known == wanted || known.trim_end_matches("kdf") == wanted
        })
        .ok_or_else(|| anyhow!("неизвестная функция вывода ключа: {}", name))
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Прочитать параметры KDF из JSON-файла
pub fn load_params(path: &Path) -> anyhow::Result<KdfParams> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("не удалось прочитать {}", path.display()))?;
    let params: KdfParams = serde_json::from_str(&json)
        .with_context(|| format!("некорректные параметры в {}", path.display()))?;
    Ok(params)
}

/// Хеш файла-ключа (SHA-256 от содержимого)
pub fn hash_key_file(path: &Path) -> anyhow::Result<SecureBytes> {
    let contents = SecureBytes::new(
        std::fs::read(path).with_context(|| format!("не удалось прочитать {}", path.display()))?,
    );
    if contents.is_empty() {
        bail!("файл-ключ {} пуст", path.display());
    }
    Ok(SecureBytes::digest::<Sha256>(&[&contents[..]]))
}

/// Запросить пароль
pub fn prompt_password() -> anyhow::Result<SecureBytes> {
    let password = rpassword::prompt_password("Введите мастер-пароль: ")?;
    Ok(SecureBytes::new(password.into_bytes()))
}

/// Несекретный отпечаток ключа для сравнения результатов
pub fn fingerprint(key: &[u8]) -> String {
    hex::encode(&Sha256::digest(key)[..8])
}

/// Выполнить `job` в рабочем потоке, показывая прогресс, пока он не завершится.
///
/// Ctrl-C отменяет `progress`; сама операция должна это заметить.
pub fn run_with_progress<T, F>(label: &str, progress: &Progress, job: F) -> (Result<T, CryptoError>, Duration)
where
    T: Send,
    F: FnOnce(&Progress) -> Result<T, CryptoError> + Send,
{
    let started = Instant::now();
    let result = thread::scope(|scope| {
        let worker = scope.spawn(|| job(progress));

        while !worker.is_finished() {
            draw_progress(label, progress);
            thread::sleep(REFRESH_INTERVAL);
        }
        worker.join()
    });
    let elapsed = started.elapsed();
    draw_progress(label, progress);
    eprintln!();

    match result {
        Ok(result) => (result, elapsed),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn draw_progress(label: &str, progress: &Progress) {
    let percent = progress.fraction_completed() * 100.0;
    eprint!(
        "\r{} {:>5.1}% ({}/{})",
        label.cyan(),
        percent,
        progress.completed_unit_count(),
        progress.total_unit_count()
    );
    io::stderr().flush().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdbx_crypto::crypto::{AES_KDF_UUID, ARGON2D_UUID, ARGON2ID_UUID};

    #[test]
    fn test_resolve_kdf_by_name() {
        assert_eq!(resolve_kdf("aes").unwrap().uuid(), AES_KDF_UUID);
        assert_eq!(resolve_kdf("AES-KDF").unwrap().uuid(), AES_KDF_UUID);
        assert_eq!(resolve_kdf("argon2d").unwrap().uuid(), ARGON2D_UUID);
        assert_eq!(resolve_kdf("Argon2id").unwrap().uuid(), ARGON2ID_UUID);
        assert!(resolve_kdf("scrypt").is_err());
    }

    #[test]
    fn test_resolve_kdf_by_uuid() {
        let kdf = resolve_kdf("9e298b19-56db-4773-b23d-fc3ec6f0a1e6").unwrap();
        assert_eq!(kdf.name(), "Argon2id");
        assert!(resolve_kdf("00000000-0000-0000-0000-000000000000").is_err());
    }

    #[test]
    fn test_load_params_round_trip() {
        let kdf = resolve_kdf("argon2d").unwrap();
        let params = kdf.default_params();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, serde_json::to_string(&params).unwrap()).unwrap();

        assert_eq!(load_params(&path).unwrap(), params);
        assert!(load_params(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_key_file_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            hex::encode(&*hash_key_file(&path).unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        std::fs::write(&path, b"").unwrap();
        assert!(hash_key_file(&path).is_err());
    }

    #[test]
    fn test_run_with_progress_returns_job_result() {
        let progress = Progress::new();
        let (result, _) = run_with_progress("test", &progress, |_| Ok(7));
        assert_eq!(result.unwrap(), 7);
    }
}
