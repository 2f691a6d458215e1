use super::RepositoryError;
use dirs::home_dir;
use log::{debug, warn};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

// https://docs.github.com/en/authentication/keeping-your-account-and-data-secure/githubs-ssh-key-fingerprints
const GITHUB_FINGERPRINTS: &str = "github.com ecdsa-sha2-nistp256 AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBEmKSENjQEezOmxkZMy7opKgwFB9nkt5YRrYMjNuG5N87uRgg6CLrbo5wAdT/y6v0mKV0U2w0WZ2YB/++Tpockg=
github.com ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl
github.com ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABgQCj7ndNxQowgcQnjshcLrqPEiiphnt+VTTvDP6mHBL9j1aNUkY4Ue1gvwnGLVlOhGeYrnZaMgRK6+PKCUXaDbC7qtbW8gIkhL7aGCsOr/C56SJMy/BCZfxd1nWzAOxSDPgVsmerOBYfNqltV9/hWCqBywINIR+5dIg6JTJ72pcEpEjcYgXkE2YEFXV1JHnsKgbLWNlhScqb2UmyRkQyytRLtL+38TGxkxCflmO+5Z8CSSNY7GidjMIZ7Q4zMjA2n1nGrlTDkzwDCsw+wqFPGQA179cnfGWOWRVruj16z6XyvxvjJwbz0wQZ75XK5tKSb7FNyeIEs4TT4jk+S4dhPeAUC5y+bDYirYgM4GC7uEnztnZyaVWQ7B381AK4Qdrwt51ZqExKbQpTUNn+EjqoTwvqNj4kqx5QUCI0ThS/YkOxJCXmPUWZbhjpCg56i+2aB6CmK2JGhn57K5mj0MNdBXA4/WnwH6XoPWJzK5Nyu2zB3nAZp+S5hpQs+p1vN1/wsjk";

// https://docs.gitlab.com/ee/user/gitlab_com/index.html#ssh-host-keys-fingerprints
const GITLAB_FINGERPRINTS: &str = "gitlab.com ecdsa-sha2-nistp256 AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBFSMqzJeV9rUzU4kWitGjeR4PWSa29SPqJ1fVkhtj3Hw9xjLVXVYrU9QlYWrOLXBpQ6KWjbjTDTdDkoohFzgbEY==
gitlab.com ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAfuCHKVTjquxvt6CM6tdG4SLp1Btn/nOeHHE5UOzRdf
gitlab.com ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQCsj2bNKTBSpIYDEGk9KxsGh3mySTRgMtXL583qmBpzeQ+jqCMRgBqB98u3z++J1sKlXHWfM9dyhSevkMwSbhoR8XIq/U0tCNyokEi/ueaBMCvbcTHhO7FcwzY92WK4Yt0aGROY5qX2UKSeOvuP4D6TPqKF1onrSzH9bx9XUf2lEdWT/ia1NEKjunUqu1xOB/StKDHMoX4/OKyIzuS0q/T1zOATthvasJFoPrAjkohTyaDUz2LN5JoH839hViyEG82yB+MjcFV5MU3N1l1QL3cVUCh93xSaua1N85qivl+siMkPGbO5xR/En4iEY6K2XPASUEMaieWVNTRCtJ4S8H+9";

// https://bitbucket.org/site/ssh
const BITBUCKET_FINGERPRINTS: &str = "bitbucket.org ecdsa-sha2-nistp256 AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBPIQmuzMBuKdWeF4+a2sjSSpBK0iqitSQ+5BM9KhpexuGt20JpTVM7u5BDZngncgrqDMbWdxMWWOGtZ9UgbqgZE=
bitbucket.org ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIIazEu89wgQZ4bqs3d63QSMzYVa0MuJ2e2gKTKqu+UUO
bitbucket.org ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABgQDQeJzhupRu0u0cdegZIa8e86EG2qOCsIsD1Xw0xSeiPDlCr7kq97NLmMbpKTX6Esc30NuoqEEHCuc7yWtwp8dI76EEEB1VqY9QJq6vk+aySyboD5QF61I/1WeTwu+deCbgKMGbUijeXhtfbxSxm6JwGrXrhBdofTsbKRUsrN1WoNgUa8uqN1Vx6WAJw1JHPhglEGGHea6QICwJOAr/6mrui/oB7pkaWKHj3z7d1IC4KWLtY47elvjbaTlkN04Kc/5LFEirorGYVbt15kAUlqGM65pk6ZBxtaO3+30LVlORZkxOh+LKL/BvbZ/iRNhItLqNyieoQj/uh/7Iv4uyH/cV/0b4WDSd3DptigWq84lJubb9t/DnZlrJazxyDCulTmKdOR7vs9gMTo+uoIrPSb8ScTtvw65+odKAlBj59dhnVp9zd7QUojOpXlL62Aw56U4oO+FALuevvMjiWeavKhJqlR7i5n9srYcrNV7ttmDw7kf/97P5zauIhxcjX+xHv4M=";

const DEFAULT_FINGERPRINTS: [&str; 3] = [
    GITHUB_FINGERPRINTS,
    GITLAB_FINGERPRINTS,
    BITBUCKET_FINGERPRINTS,
];

/// Make sure that SSH remotes can be verified.
///
/// libgit2 refuses hosts that are not in `~/.ssh/known_hosts`. When running in a
/// container, there is usually no such file, so it is created with the host keys
/// of the most common git providers. If a custom host line is given, it is
/// appended instead, unless it is already known.
pub fn setup_known_hosts(additional_host: Option<&str>) -> Result<(), RepositoryError> {
    let ssh_dir = home_dir().unwrap_or(PathBuf::from("~")).join(".ssh");
    write_known_hosts(&ssh_dir, additional_host)
}

fn write_known_hosts(ssh_dir: &Path, additional_host: Option<&str>) -> Result<(), RepositoryError> {
    if !ssh_dir.exists() {
        fs::create_dir_all(ssh_dir).map_err(|_| RepositoryError::SshConfigFailed)?;
    }
    let known_hosts = ssh_dir.join("known_hosts");

    match additional_host {
        Some(host) => {
            let is_known = known_hosts.exists()
                && fs::read_to_string(&known_hosts)
                    .map_err(|_| RepositoryError::SshConfigFailed)?
                    .lines()
                    .any(|line| line.trim() == host.trim());
            if is_known {
                return Ok(());
            }

            debug!(
                "Host key not found in {}, adding from arguments.",
                known_hosts.display()
            );
            let mut file = File::options()
                .append(true)
                .create(true)
                .open(&known_hosts)
                .map_err(|_| RepositoryError::SshConfigFailed)?;
            writeln!(file, "{}", host.trim()).map_err(|_| RepositoryError::SshConfigFailed)?;
        }
        None if !known_hosts.exists() => {
            warn!(
                "There is no {}, creating with default fingerprints.",
                known_hosts.display()
            );
            let mut file =
                File::create(&known_hosts).map_err(|_| RepositoryError::SshConfigFailed)?;
            for fingerprints in DEFAULT_FINGERPRINTS {
                writeln!(file, "{fingerprints}").map_err(|_| RepositoryError::SshConfigFailed)?;
            }
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::{Alphanumeric, DistString};

    fn ssh_dir() -> PathBuf {
        let id = Alphanumeric.sample_string(&mut rand::thread_rng(), 16);
        PathBuf::from(format!("test_directories/{id}-ssh"))
    }

    #[test]
    fn it_should_create_default_known_hosts() -> Result<(), RepositoryError> {
        let dir = ssh_dir();
        write_known_hosts(&dir, None)?;

        let contents = fs::read_to_string(dir.join("known_hosts")).unwrap();
        assert!(contents.contains("github.com ssh-ed25519"));
        assert!(contents.contains("gitlab.com ssh-ed25519"));
        assert!(contents.contains("bitbucket.org ssh-ed25519"));

        fs::remove_dir_all(dir).unwrap();
        Ok(())
    }

    #[test]
    fn it_should_not_touch_existing_known_hosts() -> Result<(), RepositoryError> {
        let dir = ssh_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("known_hosts"), "example.com ssh-ed25519 AAAA\n").unwrap();

        write_known_hosts(&dir, None)?;

        let contents = fs::read_to_string(dir.join("known_hosts")).unwrap();
        assert_eq!("example.com ssh-ed25519 AAAA\n", contents);

        fs::remove_dir_all(dir).unwrap();
        Ok(())
    }

    #[test]
    fn it_should_append_the_additional_host_once() -> Result<(), RepositoryError> {
        let dir = ssh_dir();
        let host = "git.example.com ssh-ed25519 AAAA";

        write_known_hosts(&dir, Some(host))?;
        write_known_hosts(&dir, Some(host))?;

        let contents = fs::read_to_string(dir.join("known_hosts")).unwrap();
        assert_eq!(1, contents.matches(host).count());
        assert!(!contents.contains("github.com"));

        fs::remove_dir_all(dir).unwrap();
        Ok(())
    }
}
