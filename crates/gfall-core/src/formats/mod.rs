pub mod fortran;
