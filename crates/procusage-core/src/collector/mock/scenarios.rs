//! Pre-built mock filesystem scenarios for testing.
//!
//! These provide realistic `/proc` contents for a single measured process
//! on different kernel generations.

use super::filesystem::MockFs;

/// `/proc/uptime` shared by all scenarios.
pub const UPTIME: &str = "12345.67 10000.00\n";

/// `/proc/[pid]/stat` with all 52 fields (kernel 3.5+).
pub const STAT_MODERN: &str = "4242 (php) R 4200 4242 4200 34816 4242 4194304 1500 0 2 0 250 40 10 5 25 5 1 0 100 123456789 3000 18446744073709551615 94000000000000 94000000100000 140730000000000 0 0 0 0 4096 0 0 0 0 17 3 0 0 12 0 0 94000000200000 94000000210000 94000001000000 140730000001000 140730000001100 140730000001100 140730000002000 0\n";

/// `/proc/[pid]/stat` with the 42 fields of a 2.6.18 kernel.
pub const STAT_LEGACY: &str = "4242 (php) S 4200 4242 4200 34816 4242 4194304 1500 0 2 0 250 40 10 5 25 5 1 0 100 123456789 3000 18446744073709551615 134512640 134948884 3219910816 0 0 0 0 4096 0 0 0 0 17 0 0 0 12\n";

pub const IO: &str = "\
rchar: 323934931
wchar: 323929600
syscr: 632687
syscw: 632675
read_bytes: 0
write_bytes: 323932160
cancelled_write_bytes: 0
";

pub const SCHED_MODERN: &str = "\
php (4242, #threads: 1)
-------------------------------------------------------------------
se.exec_start                                :      12345678.901234
se.vruntime                                  :           123.456789
se.sum_exec_runtime                          :          2900.123456
se.nr_migrations                             :                    3
se.statistics.iowait_sum                     :          1500.000000
se.statistics.iowait_count                   :                    7
nr_switches                                  :                   42
nr_voluntary_switches                        :                   40
nr_involuntary_switches                      :                    2
se.load.weight                               :                 1024
policy                                       :                    0
prio                                         :                  125
clock-delta                                  :                   55
";

/// Older kernels print the schedstat keys without the `se.statistics.` prefix.
pub const SCHED_LEGACY: &str = "\
php (4242, #threads: 1)
---------------------------------------------------------
se.exec_start                      :      12345678.901234
se.sum_exec_runtime                :          2900.123456
iowait_sum                         :          1500.000000
iowait_count                       :                    7
nr_switches                        :                   42
policy                             :                    0
prio                               :                  125
";

pub const CMDLINE: &[u8] = b"php\0/srv/app/cron.php\0--verbose\0";

impl MockFs {
    /// A running `php` process (PID 4242), also reachable as `/proc/self`.
    pub fn typical_process() -> Self {
        let mut fs = Self::new();
        fs.add_file("/proc/uptime", UPTIME);
        fs.add_process(4242, STAT_MODERN, IO, SCHED_MODERN, CMDLINE);
        fs.link_self(4242);
        fs
    }

    /// The same process on a kernel that only emits the 42 mandatory stat
    /// fields and the older sched layout.
    pub fn legacy_kernel() -> Self {
        let mut fs = Self::new();
        fs.add_file("/proc/uptime", UPTIME);
        fs.add_process(4242, STAT_LEGACY, IO, SCHED_LEGACY, CMDLINE);
        fs.link_self(4242);
        fs
    }

    /// A kernel thread: empty command line, name with spaces and parentheses.
    pub fn kernel_thread() -> Self {
        let mut fs = Self::typical_process();
        fs.add_process(
            77,
            "77 (kworker/0:1 (events)) I 2 0 0 0 -1 69238880 0 0 0 0 0 310 0 0 20 0 1 0 35 0 0 18446744073709551615 0 0 0 0 0 0 0 2147483647 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n",
            "rchar: 0\nwchar: 0\nsyscr: 0\nsyscw: 0\nread_bytes: 0\nwrite_bytes: 0\ncancelled_write_bytes: 0\n",
            SCHED_MODERN,
            b"",
        );
        fs
    }
}
