//! Integration tests for toolsmith

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Command with an isolated, nonexistent config file
    fn toolsmith(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("toolsmith");
        cmd.env("TOOLSMITH_CONFIG", temp.path().join("config.toml"))
            .env_remove("RUST_LOG")
            .env_remove("GITHUB_REPOSITORY");
        cmd
    }

    const RELEASE: [&str; 4] = ["--repository", "owner/toolchains", "--release-id", "v1"];

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        toolsmith(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Staged cross-compilation toolchain builder"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        toolsmith(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("toolsmith"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        toolsmith(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        toolsmith(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[engine]"))
            .stdout(predicate::str::contains("x86_64-linux-gnu"));
    }

    #[test]
    fn config_show_reads_file_and_build_root_flag() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            "[archive]\ntarget_triple = \"aarch64-linux-gnu\"\n",
        )
        .unwrap();

        toolsmith(&temp)
            .args(["config", "show", "--build-root", "/srv/contexts"])
            .assert()
            .success()
            .stdout(predicate::str::contains("aarch64-linux-gnu"))
            .stdout(predicate::str::contains("/srv/contexts"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[engine\n").unwrap();

        toolsmith(&temp)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn gcc_rejects_two_host_references() {
        let temp = TempDir::new().unwrap();
        toolsmith(&temp)
            .arg("gcc")
            .args(RELEASE)
            .args([
                "--sysroot-path",
                "sysroot-linux-kernel-6.1+glibc-2.38-x86_64-linux-gnu.tar.xz",
                "--gcc-version",
                "13.2.0",
                "--binutils-version",
                "2.41",
                "--host-gcc-path",
                "gcc-12.3.0-x86_64-linux-gnu.tar.xz",
                "--host-gcc-version",
                "12.3.0",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration error"))
            .stderr(predicate::str::contains("mutually exclusive"));
    }

    #[test]
    fn clang_requires_a_host_compiler() {
        let temp = TempDir::new().unwrap();
        toolsmith(&temp)
            .arg("clang")
            .args(RELEASE)
            .args([
                "--sysroot-path",
                "sysroot-x.tar.xz",
                "--cmake-path",
                "cmake-3.28.1.tar.xz",
                "--llvm-version",
                "17.0.6",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration error"));
    }

    #[test]
    fn cmake_rejects_unsupported_compression() {
        let temp = TempDir::new().unwrap();
        toolsmith(&temp)
            .args([
                "cmake",
                "--cache-path",
                "cmake-3.28.1.tar.gz",
                "--host-gcc-path",
                "gcc-13.2.0-x86_64-linux-gnu.tar.xz",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported archive compression"));
    }

    #[test]
    fn release_commands_require_repository() {
        let temp = TempDir::new().unwrap();
        toolsmith(&temp)
            .args([
                "sysroot",
                "--release-id",
                "v1",
                "--linux-kernel-version",
                "6.1",
                "--glibc-version",
                "2.38",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--repository"));
    }
}
