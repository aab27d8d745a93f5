//! Account contract ABI surface used by the coordinator.

use alloy_sol_types::sol;

sol! {
    function execTransaction(
        address to,
        uint256 value,
        bytes data,
        uint8 operation,
        uint256 safeTxGas,
        uint256 baseGas,
        uint256 gasPrice,
        address gasToken,
        address refundReceiver,
        bytes signatures
    ) external payable returns (bool success);

    function getOwners() external view returns (address[] owners);
    function getThreshold() external view returns (uint256 threshold);
    function nonce() external view returns (uint256 current);
    function approvedHashes(address owner, bytes32 hash) external view returns (uint256 approved);
    function approveHash(bytes32 hashToApprove) external;

    function addOwnerWithThreshold(address owner, uint256 _threshold) external;
    function removeOwner(address prevOwner, address owner, uint256 _threshold) external;
    function swapOwner(address prevOwner, address oldOwner, address newOwner) external;
    function changeThreshold(uint256 _threshold) external;
}
