//! Transfer session over a process group.
//!
//! Overlay construction is serial: only the coordinating rank builds the
//! overlay, from private copies of both meshes read from their canonical
//! files, and persists it. Every rank then reads the persisted overlay back
//! onto its own partition of the two windows:
//!
//! 1. barrier, so both meshes are assembled everywhere;
//! 2. rank 0 reads both files into self-scoped scratch windows, overlays
//!    them, writes the artifact pair and deletes the scratch windows;
//! 3. barrier, so the artifacts are complete before anyone reads them;
//! 4. every rank reads the artifacts with the group communicator.
//!
//! A stall on rank 0 stalls the group at the second barrier; there is no
//! timeout.

use std::sync::Arc;

use crate::algs::communicator::Communicator;
use crate::config::ExchangeConfig;
use crate::exchange_error::ExchangeError;
use crate::store::modules::{LsqOptions, MeshReader, ModuleRegistry};
use crate::store::{DataStore, WindowScope};
use crate::transfer::session::{TransferDirection, TransferSession, WindowPair};
use crate::transfer::window_name::window_name_from_path;

/// [`TransferSession`] whose overlay follows the coordinator protocol.
pub struct ParallelTransferSession<C: Communicator> {
    session: TransferSession,
    comm: C,
    modules: ModuleRegistry,
    config: ExchangeConfig,
}

impl<C: Communicator> std::fmt::Debug for ParallelTransferSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelTransferSession")
            .field("session", &self.session)
            .field("rank", &self.comm.rank())
            .field("size", &self.comm.size())
            .finish()
    }
}

impl<C: Communicator> ParallelTransferSession<C> {
    /// Load the overlay engine as instance `name` for this rank.
    pub fn new(
        name: &str,
        store: Arc<dyn DataStore>,
        modules: &ModuleRegistry,
        comm: C,
        config: &ExchangeConfig,
    ) -> Result<Self, ExchangeError> {
        let session = TransferSession::new(name, store, modules, config)?;
        Ok(Self {
            session,
            comm,
            modules: modules.clone(),
            config: config.clone(),
        })
    }

    /// The underlying sequential session.
    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn set_lsq_options(&mut self, options: LsqOptions) {
        self.session.set_lsq_options(options);
    }

    /// Overlay `first` and `second`, building it once on rank 0 from the two files.
    pub fn overlay(
        &mut self,
        first: &str,
        second: &str,
        first_file: &str,
        second_file: &str,
    ) -> Result<(), ExchangeError> {
        log::debug!("rank {}: entering overlay barrier", self.comm.rank());
        self.comm.barrier();

        let built = if self.comm.is_root() {
            self.build_on_root(first, second, first_file, second_file)
        } else {
            Ok(())
        };

        // Reached on every rank, including a failed coordinator.
        self.comm.barrier();
        log::debug!("rank {}: overlay artifacts ready", self.comm.rank());
        built?;

        let (a, b) = self.session.mesh_handles(first, second)?;
        let format = &self.config.overlay_format;
        self.session.engine().lock().read_overlay(
            self.session.store().as_ref(),
            &a,
            &b,
            &self.comm,
            first,
            second,
            format,
        )?;
        self.session.bind(WindowPair::new(first, second));
        Ok(())
    }

    /// [`ParallelTransferSession::overlay`] with window names derived from the file paths.
    pub fn overlay_files(&mut self, first_file: &str, second_file: &str) -> Result<(), ExchangeError> {
        let first = window_name_from_path(first_file)?;
        let second = window_name_from_path(second_file)?;
        self.overlay(&first, &second, first_file, second_file)
    }

    fn build_on_root(
        &self,
        first: &str,
        second: &str,
        first_file: &str,
        second_file: &str,
    ) -> Result<(), ExchangeError> {
        let suffix = &self.config.scratch_window_suffix;
        let scratch = [format!("{first}{suffix}"), format!("{second}{suffix}")];
        let result = self.overlay_scratch(&scratch, [first_file, second_file], first, second);
        let store = self.session.store();
        for window in &scratch {
            if store.has_window(window) {
                if let Err(e) = store.delete_window(window) {
                    log::warn!("could not delete scratch window `{window}`: {e}");
                }
            }
        }
        match &result {
            Ok(()) => log::info!("overlay of `{first}` and `{second}` written on rank 0"),
            Err(e) => log::warn!("overlay of `{first}` and `{second}` failed on rank 0: {e}"),
        }
        result
    }

    fn overlay_scratch(
        &self,
        scratch: &[String; 2],
        files: [&str; 2],
        first: &str,
        second: &str,
    ) -> Result<(), ExchangeError> {
        let store = self.session.store().as_ref();
        {
            let reader = self
                .modules
                .acquire::<dyn MeshReader>(&self.config.reader_module, &self.config.reader_instance)?;
            for (window, file) in scratch.iter().zip(files) {
                reader
                    .lock()
                    .read_mesh(store, file, window, WindowScope::SelfOnly)?;
                store.init_done(window)?;
            }
        }
        let (a, b) = self.session.mesh_handles(&scratch[0], &scratch[1])?;
        let mut engine = self.session.engine().lock();
        engine.overlay(store, &a, &b)?;
        engine.write_overlay(store, &a, &b, first, second, &self.config.overlay_format)?;
        engine.clear_overlay(store, &a, &b)
    }

    /// Least-squares transfer on the bound pair.
    pub fn transfer(
        &self,
        source_item: &str,
        target_item: &str,
        direction: TransferDirection,
    ) -> Result<(), ExchangeError> {
        self.session.transfer(source_item, target_item, direction)
    }

    /// Interpolation on the bound pair.
    pub fn interpolate(
        &self,
        source_item: &str,
        target_item: &str,
        direction: TransferDirection,
    ) -> Result<(), ExchangeError> {
        self.session.interpolate(source_item, target_item, direction)
    }

    /// Load transfer on the bound pair.
    pub fn transfer_load(
        &self,
        source_item: &str,
        target_item: &str,
        direction: TransferDirection,
    ) -> Result<(), ExchangeError> {
        self.session.transfer_load(source_item, target_item, direction)
    }
}
